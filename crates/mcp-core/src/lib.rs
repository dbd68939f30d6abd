//! Core protocol types for mcp-adapters
//!
//! This crate defines the wire-level vocabulary shared by the MCP client and
//! server crates: the JSON-RPC 2.0 envelope, tool descriptors, content blocks,
//! call results, and the JSON-schema helpers used to declare and validate tool
//! arguments.

pub mod error;
pub mod jsonrpc;
pub mod schema;
pub mod types;

pub use error::{Error, Result};
pub use jsonrpc::{JsonRpcError, JsonRpcMessage, JsonRpcRequest, JsonRpcResponse, RequestId};
pub use types::{
    CallToolParams, CallToolResult, Content, Implementation, InitializeResult, ListToolsResult,
    ServerCapabilities, ToolDescriptor, ToolsCapability,
};

/// Protocol revision spoken by both sides of the connection
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Protocol revisions this implementation understands, newest first
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2025-03-26", PROTOCOL_VERSION];

/// JSON-RPC method names used by the tool protocol
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const CANCELLED: &str = "notifications/cancelled";
    pub const PING: &str = "ping";
    pub const TOOLS_LIST: &str = "tools/list";
    pub const TOOLS_CALL: &str = "tools/call";
}
