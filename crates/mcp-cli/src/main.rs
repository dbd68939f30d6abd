//! Command-line interface for mcp-adapters

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use comfy_table::{Table, presets::UTF8_FULL};
use mcp_client::{ConnectPolicy, MCPClientManager, MCPConfig, MCPError, MCPTool, load_all_tools};
use mcp_core::schema::ParameterSpec;
use mcp_tools::Tool;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "mcp-cli")]
#[command(about = "List and call tools on MCP servers", long_about = None)]
struct Cli {
    /// Server config file; defaults to ~/.config/mcp-adapters/mcp.json merged with ./.mcp.json
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Skip servers that fail to connect instead of aborting
    #[arg(long, global = true)]
    best_effort: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show configured servers and whether they answer
    Servers,
    /// List the tools every server exposes
    Tools {
        /// Only list tools from this server
        #[arg(short, long)]
        server: Option<String>,
    },
    /// Call one tool and print its text answer
    Call {
        server: String,
        tool: String,
        /// Tool arguments as a JSON object
        #[arg(short, long, default_value = "{}")]
        args: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mcp_utils::init_tracing_with_filter("warn");

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;
    debug!("Loaded {} server configs", config.mcp_servers.len());

    let policy = if cli.best_effort {
        ConnectPolicy::BestEffort
    } else {
        ConnectPolicy::FailFast
    };

    match cli.command {
        Commands::Servers => servers(config, policy).await,
        Commands::Tools { server } => {
            let config = match server {
                Some(name) => only_server(config, &name)?,
                None => config,
            };
            tools(config, policy).await
        }
        Commands::Call { server, tool, args } => {
            let arguments = parse_arguments(&args)?;
            call(only_server(config, &server)?, &server, &tool, arguments).await
        }
    }
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<MCPConfig> {
    let config = match path {
        Some(path) => MCPConfig::from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => MCPConfig::load_merged().context("Failed to load MCP server config")?,
    };

    if config.mcp_servers.is_empty() {
        bail!("No MCP servers configured");
    }
    Ok(config)
}

/// Narrow the config to one server so only that one is spawned
fn only_server(mut config: MCPConfig, name: &str) -> anyhow::Result<MCPConfig> {
    config.mcp_servers.retain(|server, _| server == name);
    if config.mcp_servers.is_empty() {
        return Err(MCPError::ServerNotFound(name.to_string()).into());
    }
    Ok(config)
}

fn parse_arguments(raw: &str) -> anyhow::Result<Value> {
    let value: Value = serde_json::from_str(raw).context("--args is not valid JSON")?;
    if !value.is_object() {
        bail!("--args must be a JSON object");
    }
    Ok(value)
}

fn describe_parameters(parameters: &[ParameterSpec]) -> String {
    parameters
        .iter()
        .map(|p| {
            let marker = if p.required { "" } else { "?" };
            format!("{}{}: {}", p.name, marker, p.kind)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn tools_table(tools: &[MCPTool]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Server", "Tool", "Description", "Parameters"]);

    for tool in tools {
        table.add_row(vec![
            tool.server_name().to_string(),
            tool.name().to_string(),
            tool.description().to_string(),
            describe_parameters(&tool.parameters()),
        ]);
    }
    table
}

async fn connect(config: MCPConfig, policy: ConnectPolicy) -> anyhow::Result<MCPClientManager> {
    let manager = MCPClientManager::new(Arc::new(config)).with_policy(policy);
    manager.initialize().await?;
    Ok(manager)
}

async fn servers(config: MCPConfig, policy: ConnectPolicy) -> anyhow::Result<()> {
    let configured: Vec<(String, &'static str)> = {
        let mut servers: Vec<_> = config
            .mcp_servers
            .iter()
            .map(|(name, server)| (name.clone(), server.transport_name()))
            .collect();
        servers.sort();
        servers
    };

    // Report unreachable servers rather than aborting on them
    let manager = connect(config, ConnectPolicy::BestEffort).await?;
    let health = manager.health_check().await;

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Server", "Transport", "Status"]);
    for (name, transport) in &configured {
        let status = match health.get(name).copied() {
            Some(true) => "ready",
            Some(false) => "unhealthy",
            None => "unreachable",
        };
        table.add_row(vec![name.as_str(), *transport, status]);
    }
    println!("{table}");

    manager.shutdown().await?;

    if policy == ConnectPolicy::FailFast && health.values().filter(|ok| **ok).count() < configured.len() {
        bail!("Not every configured server is reachable");
    }
    Ok(())
}

async fn tools(config: MCPConfig, policy: ConnectPolicy) -> anyhow::Result<()> {
    let manager = connect(config, policy).await?;
    let tools = load_all_tools(&manager).await?;
    info!("Found {} tools", tools.len());

    println!("{}", tools_table(&tools));

    manager.shutdown().await?;
    Ok(())
}

async fn call(config: MCPConfig, server: &str, tool: &str, arguments: Value) -> anyhow::Result<()> {
    let manager = connect(config, ConnectPolicy::FailFast).await?;
    let result = manager.call_tool(server, tool, arguments).await;
    manager.shutdown().await?;

    let result = result?;
    let text = result.first_text().unwrap_or_default();
    if result.is_error() {
        bail!("{text}");
    }

    println!("{text}");
    Ok(())
}
