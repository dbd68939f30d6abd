//! Shared utilities for mcp-adapters
//!
//! This crate provides common functionality used across the mcp-adapters workspace,
//! including logging setup and application-level configuration.

pub mod config;
pub mod logging;

pub use config::Config;
pub use logging::{init_tracing, init_tracing_with_filter};
