//! Error types for the tool server

use thiserror::Error;

/// Failure of a single tool call
///
/// These never leave the server as protocol errors; they are rendered into
/// the call result as `"Error: {self}"`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    /// Requested name is not registered
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Arguments do not satisfy the tool's input schema
    #[error("Invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// The tool ran and failed
    #[error("{tool} failed: {reason}")]
    Execution { tool: String, reason: String },
}

/// Errors raised while assembling a registry
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RegistryError {
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Input schema for tool '{0}' must be a JSON object schema")]
    InvalidSchema(String),
}
