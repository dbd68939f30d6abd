//! End-to-end sessions against the math-server binary over stdio

use mcp_client::client::{MCPClient, StdioMCPClient};
use mcp_client::discovery::load_tools;
use mcp_client::session::SessionState;
use mcp_client::MCPError;
use mcp_tools::Tool;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

fn math_session() -> StdioMCPClient {
    StdioMCPClient::stdio(
        env!("CARGO_BIN_EXE_math-server"),
        vec![],
        HashMap::from([("RUST_LOG".to_string(), "warn".to_string())]),
        None,
        Duration::from_secs(10),
    )
}

async fn call_text(session: &StdioMCPClient, tool: &str, arguments: serde_json::Value) -> String {
    let result = session.call_tool(tool, arguments).await.unwrap();
    result.first_text().unwrap_or_default().to_string()
}

#[tokio::test]
async fn test_operations_require_initialize() {
    let session = math_session();

    assert!(matches!(session.list_tools().await, Err(MCPError::NotInitialized(_))));
    assert!(matches!(
        session.call_tool("add", json!({"a": 1, "b": 2})).await,
        Err(MCPError::NotInitialized(_))
    ));
    assert_eq!(session.state(), SessionState::Uninitialized);
}

#[tokio::test]
async fn test_handshake_and_listing() {
    let session = math_session();
    session.initialize().await.unwrap();
    assert!(session.is_initialized());

    let info = session.server_info().await.unwrap();
    assert_eq!(info.name, "math-server");
    assert_eq!(info.protocol_version, mcp_core::PROTOCOL_VERSION);

    let first: Vec<_> = session.list_tools().await.unwrap().into_iter().map(|t| t.name).collect();
    let second: Vec<_> = session.list_tools().await.unwrap().into_iter().map(|t| t.name).collect();
    assert_eq!(first, vec!["add", "multiply", "addArguments", "multiplyArguments"]);
    assert_eq!(first, second);

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_math_calls() {
    let session = math_session();
    session.initialize().await.unwrap();

    assert_eq!(call_text(&session, "add", json!({"a": 54, "b": 6})).await, "54.0 + 6.0 = 60.0");
    assert_eq!(
        call_text(&session, "multiplyArguments", json!({"numbers": [2, 3, 4]})).await,
        "2.0 * 3.0 * 4.0 = 24.0"
    );
    assert_eq!(
        call_text(&session, "addArguments", json!({"numbers": [1, 2, 3.5]})).await,
        "1.0 + 2.0 + 3.5 = 6.5"
    );

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_tool_errors_come_back_as_text() {
    let session = math_session();
    session.initialize().await.unwrap();

    let unknown = session.call_tool("divide", json!({"a": 1, "b": 2})).await.unwrap();
    assert!(unknown.is_error());
    assert_eq!(unknown.first_text(), Some("Error: Unknown tool: divide"));

    let missing = call_text(&session, "add", json!({"a": 1})).await;
    assert_eq!(
        missing,
        "Error: Invalid arguments for tool 'add': missing required field 'b'"
    );

    // The session stays usable after tool errors
    assert_eq!(call_text(&session, "multiply", json!({"a": 2.5, "b": 4})).await, "2.5 * 4.0 = 10.0");

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_loaded_tools_execute() {
    let session = Arc::new(math_session());
    session.initialize().await.unwrap();

    let tools = load_tools(session.clone(), "math").await.unwrap();
    assert_eq!(tools.len(), 4);

    let add = tools.iter().find(|t| t.name() == "add").unwrap();
    assert_eq!(add.description(), "Add two numbers");
    assert_eq!(add.execute(json!({"a": 54, "b": 6})).await.unwrap(), "54.0 + 6.0 = 60.0");

    session.close().await.unwrap();
}

#[tokio::test]
async fn test_close_is_final() {
    let session = math_session();
    session.initialize().await.unwrap();
    session.close().await.unwrap();

    assert_eq!(session.state(), SessionState::Closed);
    assert!(session.list_tools().await.is_err());
    assert!(matches!(session.initialize().await, Err(MCPError::SessionClosed)));

    // Closing twice is harmless
    session.close().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_calls_share_one_session() {
    let session = Arc::new(math_session());
    session.initialize().await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let session = Arc::clone(&session);
        handles.push(tokio::spawn(async move {
            let result = session.call_tool("add", json!({"a": i, "b": 1})).await.unwrap();
            result.first_text().unwrap_or_default().to_string()
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap(), format!("{}.0 + 1.0 = {}.0", i, i + 1));
    }

    session.close().await.unwrap();
}
