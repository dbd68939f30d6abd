//! Configuration management utilities

use serde::{Deserialize, Serialize};

/// Application identity reported to peers during the handshake
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application name
    pub app_name: String,
    /// Application version
    pub version: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "mcp-adapters".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Config {
    /// Create a config for a named application
    pub fn named(app_name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            version: version.into(),
        }
    }
}
