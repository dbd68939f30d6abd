//! Error types for mcp-core

use thiserror::Error;

/// Result type alias for mcp-core
pub type Result<T> = std::result::Result<T, Error>;

/// Error type shared by tool callables and protocol plumbing
#[derive(Error, Debug)]
pub enum Error {
    /// The session carrying the call is unusable
    #[error("Session failed: {0}")]
    Session(String),

    /// The peer sent something that violates the protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A tool could not be executed
    #[error("Tool execution failed: {0}")]
    Tool(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
