//! Math tool server speaking MCP over stdio

use clap::Parser;
use mcp_core::Implementation;
use mcp_server::McpServer;
use mcp_server::math::math_registry;
use mcp_server::transport::serve_stdio;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "math-server")]
#[command(about = "MCP server exposing basic arithmetic tools over stdio", long_about = None)]
struct Args {
    /// Server name reported during the handshake
    #[arg(long, default_value = "math-server")]
    name: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the protocol
    mcp_utils::init_tracing();

    let args = Args::parse();
    let config = mcp_utils::Config::named(args.name, env!("CARGO_PKG_VERSION"));

    let registry = math_registry()?;
    info!("Loaded {} tools", registry.len());

    let server = McpServer::new(
        Implementation::new(config.app_name, config.version),
        registry,
    );
    serve_stdio(Arc::new(server)).await?;

    Ok(())
}
