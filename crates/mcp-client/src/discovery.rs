//! Tool loading and registration
//!
//! Turns the tools advertised by MCP sessions into [`MCPTool`] callables,
//! optionally registering them into a [`ToolRegistry`].

use mcp_tools::ToolRegistry;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::Result;
use crate::client::ArcMCPClient;
use crate::client::manager::MCPClientManager;
use crate::tool::MCPTool;

/// One callable per tool the session advertises, in server order
///
/// The session must already be initialized.
///
/// # Example
///
/// ```no_run
/// use mcp_client::client::{MCPClient, StdioMCPClient};
/// use mcp_client::discovery::load_tools;
/// use mcp_tools::Tool;
/// use std::collections::HashMap;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() -> mcp_client::Result<()> {
/// let session = Arc::new(StdioMCPClient::stdio(
///     "math-server",
///     vec![],
///     HashMap::new(),
///     None,
///     Duration::from_secs(30),
/// ));
/// session.initialize().await?;
///
/// for tool in load_tools(session, "math").await? {
///     println!("{}: {}", tool.name(), tool.description());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn load_tools(session: ArcMCPClient, server_name: &str) -> Result<Vec<MCPTool>> {
    let tools = session.list_tools().await?;
    debug!("Loading {} tools from '{}'", tools.len(), server_name);

    Ok(tools
        .into_iter()
        .map(|definition| MCPTool::new(server_name, definition, Arc::clone(&session)))
        .collect())
}

/// Callables for every tool on every connected server
pub async fn load_all_tools(manager: &MCPClientManager) -> Result<Vec<MCPTool>> {
    let mut tools = Vec::new();

    for info in manager.discover_tools().await? {
        match manager.get_client(&info.server_name).await {
            Some(session) => tools.push(MCPTool::new(info.server_name, info.definition, session)),
            None => warn!(
                "Server '{}' disconnected while loading tool '{}'",
                info.server_name, info.definition.name
            ),
        }
    }

    Ok(tools)
}

/// Load every tool and register it; returns how many were registered
///
/// Tools are registered by name, so a later server's tool replaces an
/// earlier one with the same name.
pub async fn register_tools(manager: &MCPClientManager, registry: &ToolRegistry) -> Result<usize> {
    let tools = load_all_tools(manager).await?;
    let count = tools.len();

    for tool in tools {
        debug!(
            "Registering MCP tool '{}' from server '{}'",
            tool.definition().name,
            tool.server_name()
        );
        registry.register(Arc::new(tool));
    }

    info!("Registered {} MCP tools", count);
    Ok(count)
}

/// Names of every tool on every connected server
pub async fn list_available_tools(manager: &MCPClientManager) -> Result<Vec<String>> {
    let tools = manager.discover_tools().await?;
    Ok(tools.into_iter().map(|t| t.definition.name).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockMCPClient;
    use crate::config::{MCPConfig, MCPServerConfig};
    use crate::error::MCPError;
    use mcp_core::{CallToolResult, ToolDescriptor};
    use mcp_tools::Tool;
    use serde_json::json;

    fn math_tools() -> Vec<ToolDescriptor> {
        ["add", "multiply", "addArguments", "multiplyArguments"]
            .into_iter()
            .map(|name| ToolDescriptor::new(name, format!("{name} tool"), json!({"type": "object"})))
            .collect()
    }

    fn math_session() -> MockMCPClient {
        let mut session = MockMCPClient::new();
        session.expect_initialize().returning(|| Ok(()));
        session.expect_list_tools().returning(|| Ok(math_tools()));
        session
            .expect_call_tool()
            .returning(|name, args| Ok(CallToolResult::success(format!("{name} {args}"))));
        session
    }

    #[tokio::test]
    async fn test_load_tools_preserves_order() {
        let tools = load_tools(Arc::new(math_session()), "math").await.unwrap();

        let names: Vec<_> = tools.iter().map(|t| t.name().to_string()).collect();
        assert_eq!(names, vec!["add", "multiply", "addArguments", "multiplyArguments"]);
        assert!(tools.iter().all(|t| t.server_name() == "math"));
    }

    #[tokio::test]
    async fn test_loaded_tool_calls_its_session() {
        let tools = load_tools(Arc::new(math_session()), "math").await.unwrap();

        let text = tools[1].execute(json!({"a": 2})).await.unwrap();
        assert_eq!(text, r#"multiply {"a":2}"#);
    }

    #[tokio::test]
    async fn test_load_tools_before_initialize() {
        let mut session = MockMCPClient::new();
        session
            .expect_list_tools()
            .returning(|| Err(MCPError::NotInitialized("tools/list".to_string())));

        let result = load_tools(Arc::new(session), "math").await;
        assert!(matches!(result, Err(MCPError::NotInitialized(_))));
    }

    #[tokio::test]
    async fn test_register_tools_from_manager() {
        let mut config = MCPConfig::default();
        config
            .mcp_servers
            .insert("math".to_string(), MCPServerConfig::stdio("math-server", vec![]));

        let manager = MCPClientManager::new(Arc::new(config)).with_client_factory(|_| {
            let session: ArcMCPClient = Arc::new(math_session());
            Ok(session)
        });
        manager.initialize().await.unwrap();

        let registry = ToolRegistry::new();
        let count = register_tools(&manager, &registry).await.unwrap();

        assert_eq!(count, 4);
        assert_eq!(registry.len(), 4);
        assert!(registry.get("multiplyArguments").is_some());
        assert_eq!(
            list_available_tools(&manager).await.unwrap(),
            vec!["add", "multiply", "addArguments", "multiplyArguments"]
        );
    }
}
