//! MCP tool server for mcp-adapters
//!
//! A server is a [`ToolRegistry`] (name → schema + handler) behind a JSON-RPC
//! dispatcher ([`McpServer`]) and a newline-delimited transport
//! ([`transport::serve`]). Tool failures never cross the protocol boundary as
//! faults: they come back as ordinary results whose text starts with
//! `"Error: "`.
//!
//! # Example
//!
//! ```no_run
//! use mcp_core::Implementation;
//! use mcp_server::{McpServer, math::math_registry, transport::serve_stdio};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let server = McpServer::new(Implementation::new("math-server", "1.0.0"), math_registry()?);
//! serve_stdio(Arc::new(server)).await?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod format;
pub mod math;
pub mod registry;
pub mod server;
pub mod transport;

pub use error::{RegistryError, ToolError};
pub use registry::{ToolHandler, ToolOutcome, ToolRegistry};
pub use server::McpServer;
