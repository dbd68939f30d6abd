//! Model Context Protocol (MCP) client for mcp-adapters
//!
//! This crate connects to tool servers that speak MCP and exposes their
//! tools as local callables:
//! - Sessions over stdio, streamable HTTP, or SSE transports
//! - A strict lifecycle: `initialize` before anything else, `close` is final
//! - Tool listing and invocation, returning the tool's text answer
//! - A manager for several named servers loaded from `mcp.json`
//!
//! # Example
//!
//! ```no_run
//! use mcp_client::client::manager::MCPClientManager;
//! use mcp_client::config::MCPConfig;
//! use mcp_client::discovery::load_all_tools;
//! use mcp_tools::Tool;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = MCPConfig::load_merged()?;
//! let manager = MCPClientManager::new(Arc::new(config));
//! manager.initialize().await?;
//!
//! for tool in load_all_tools(&manager).await? {
//!     if tool.name() == "add" {
//!         println!("{}", tool.execute(json!({"a": 54, "b": 6})).await?);
//!     }
//! }
//!
//! manager.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod discovery;
pub mod error;
pub mod retry;
pub mod session;
pub mod tool;

// Re-export commonly used types
pub use client::manager::{ConnectPolicy, MCPClientManager, MCPToolInfo};
pub use client::{
    ArcMCPClient, HttpMCPClient, MCPClient, MCPServerInfo, McpSession, SseMCPClient, StdioMCPClient,
    create_client,
};
pub use config::{MCPConfig, MCPServerConfig};
pub use discovery::{list_available_tools, load_all_tools, load_tools, register_tools};
pub use error::MCPError;
pub use retry::RetryPolicy;
pub use session::SessionState;
pub use tool::MCPTool;

/// Result type for MCP operations
pub type Result<T> = std::result::Result<T, MCPError>;
