//! Tool management for mcp-adapters
//!
//! This crate defines the callable shape an agent consumes. Tools loaded from
//! MCP servers are wrapped into this shape by `mcp-client`.

pub mod registry;
pub mod tool;

pub use registry::{ToolDefinition, ToolRegistry};
pub use tool::Tool;
