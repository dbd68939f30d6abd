//! Error types for MCP client operations

use thiserror::Error;

/// Errors that can occur during MCP operations
#[derive(Error, Debug)]
pub enum MCPError {
    /// The channel to the server could not be opened or broke mid-exchange
    #[error("MCP connection failed: {0}")]
    ConnectionFailed(String),

    /// The handshake was rejected or returned something unusable
    #[error("MCP initialization failed: {0}")]
    InitializationFailed(String),

    /// A session operation was attempted before the handshake completed
    #[error("MCP session not initialized: call initialize() before {0}")]
    NotInitialized(String),

    /// The session has been closed and cannot be reused
    #[error("MCP session is closed")]
    SessionClosed,

    /// No answer arrived within the configured bound
    #[error("MCP request timed out: {0}")]
    Timeout(String),

    /// The server answered with a JSON-RPC error or an unexpected body
    #[error("MCP request failed: {0}")]
    RequestFailed(String),

    /// MCP tool call failed
    #[error("MCP tool call failed: {0}")]
    ToolCallFailed(String),

    /// MCP server not found
    #[error("MCP server not found: {0}")]
    ServerNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Environment variable error
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    /// Invalid pattern error
    #[error("Invalid pattern: {0}")]
    InvalidPattern(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Convert MCPError to mcp_core::Error
impl From<MCPError> for mcp_core::Error {
    fn from(err: MCPError) -> Self {
        match err {
            MCPError::JsonError(e) => mcp_core::Error::Json(e),
            MCPError::RequestFailed(_) => mcp_core::Error::Protocol(err.to_string()),
            MCPError::ToolCallFailed(_) => mcp_core::Error::Tool(err.to_string()),
            other => mcp_core::Error::Session(other.to_string()),
        }
    }
}
