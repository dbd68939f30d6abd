//! Configuration types for MCP server connections
//!
//! Supports project-level (`.mcp.json`) and user-level
//! (`~/.config/mcp-adapters/mcp.json`) configuration files with merge support.

use crate::error::MCPError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Root MCP configuration
///
/// # Example
///
/// ```json
/// {
///   "mcpServers": {
///     "math": {
///       "transport": "stdio",
///       "command": "math-server",
///       "args": ["--name", "math"]
///     },
///     "weather": {
///       "transport": "sse",
///       "url": "http://localhost:8000/sse"
///     }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MCPConfig {
    /// MCP server definitions keyed by server name
    #[serde(default)]
    pub mcp_servers: HashMap<String, MCPServerConfig>,
}

/// How to reach one MCP server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "transport", rename_all = "lowercase")]
pub enum MCPServerConfig {
    /// Local subprocess speaking newline-delimited JSON-RPC on stdin/stdout
    Stdio {
        command: String,

        #[serde(default)]
        args: Vec<String>,

        /// Extra environment for the child, on top of the inherited one
        #[serde(default)]
        env: HashMap<String, String>,

        #[serde(default, skip_serializing_if = "Option::is_none")]
        cwd: Option<PathBuf>,

        #[serde(default = "default_timeout", rename = "timeoutSecs", alias = "timeout_secs")]
        timeout_secs: u64,
    },

    /// Streamable HTTP: every message is a POST
    #[serde(rename = "http")]
    Http {
        url: String,

        #[serde(default)]
        headers: HashMap<String, String>,

        #[serde(default = "default_timeout", rename = "timeoutSecs", alias = "timeout_secs")]
        timeout_secs: u64,
    },

    /// Legacy HTTP+SSE: responses arrive on a long-lived event stream
    #[serde(rename = "sse")]
    Sse {
        url: String,

        #[serde(default)]
        headers: HashMap<String, String>,

        #[serde(default = "default_timeout", rename = "timeoutSecs", alias = "timeout_secs")]
        timeout_secs: u64,
    },
}

fn default_timeout() -> u64 {
    30
}

impl MCPServerConfig {
    /// Stdio config with default timeout and no extra environment
    pub fn stdio(command: impl Into<String>, args: Vec<String>) -> Self {
        Self::Stdio {
            command: command.into(),
            args,
            env: HashMap::new(),
            cwd: None,
            timeout_secs: default_timeout(),
        }
    }

    /// Name of the transport, as written in the config file
    pub fn transport_name(&self) -> &'static str {
        match self {
            Self::Stdio { .. } => "stdio",
            Self::Http { .. } => "http",
            Self::Sse { .. } => "sse",
        }
    }

    /// Bound on the handshake and on each request
    pub fn timeout(&self) -> Duration {
        let secs = match self {
            Self::Stdio { timeout_secs, .. }
            | Self::Http { timeout_secs, .. }
            | Self::Sse { timeout_secs, .. } => *timeout_secs,
        };
        Duration::from_secs(secs)
    }

    /// Same config with a different timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        match &mut self {
            Self::Stdio { timeout_secs, .. }
            | Self::Http { timeout_secs, .. }
            | Self::Sse { timeout_secs, .. } => *timeout_secs = timeout.as_secs().max(1),
        }
        self
    }
}

impl MCPConfig {
    /// Load configuration from a file
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use mcp_client::config::MCPConfig;
    /// let config = MCPConfig::from_file(".mcp.json")?;
    /// # Ok::<(), mcp_client::error::MCPError>(())
    /// ```
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, MCPError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| MCPError::ConfigError(format!("Failed to read config file: {}", e)))?;

        let mut config: MCPConfig = serde_json::from_str(&content)
            .map_err(|e| MCPError::ConfigError(format!("Failed to parse config file: {}", e)))?;

        config.resolve_env_vars()?;

        Ok(config)
    }

    /// Load merged configuration (user + project)
    ///
    /// Loads the user-level config from `~/.config/mcp-adapters/mcp.json` and
    /// merges the project-level `.mcp.json` over it. Missing files are skipped.
    pub fn load_merged() -> Result<Self, MCPError> {
        let mut config = Self::load_user_config().unwrap_or_default();

        if let Ok(project_config) = Self::load_project_config() {
            config.merge(project_config);
        }

        Ok(config)
    }

    /// Load user-level config from `~/.config/mcp-adapters/mcp.json`
    pub fn load_user_config() -> Result<Self, MCPError> {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .map_err(|_| MCPError::ConfigError("HOME or USERPROFILE not set".to_string()))?;

        let path = PathBuf::from(home)
            .join(".config")
            .join("mcp-adapters")
            .join("mcp.json");

        Self::from_file(path)
    }

    /// Load project-level config from `.mcp.json`
    pub fn load_project_config() -> Result<Self, MCPError> {
        Self::from_file(".mcp.json")
    }

    /// Merge another config into this one; `other` wins on name clashes
    pub fn merge(&mut self, other: MCPConfig) {
        self.mcp_servers.extend(other.mcp_servers);
    }

    /// Server names in a stable (sorted) order
    pub fn server_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.mcp_servers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Resolve environment variables in configuration
    ///
    /// Supports `${VAR}` and `$VAR` syntax for environment variable expansion.
    pub fn resolve_env_vars(&mut self) -> Result<(), MCPError> {
        for server_config in self.mcp_servers.values_mut() {
            match server_config {
                MCPServerConfig::Stdio {
                    command,
                    args,
                    env,
                    cwd,
                    ..
                } => {
                    *command = resolve_env_string(command)?;

                    for arg in args.iter_mut() {
                        *arg = resolve_env_string(arg)?;
                    }

                    for value in env.values_mut() {
                        *value = resolve_env_string(value)?;
                    }

                    if let Some(path) = cwd {
                        let resolved = resolve_env_string(&path.to_string_lossy())?;
                        *path = PathBuf::from(resolved);
                    }
                }
                MCPServerConfig::Http { url, headers, .. }
                | MCPServerConfig::Sse { url, headers, .. } => {
                    *url = resolve_env_string(url)?;

                    for value in headers.values_mut() {
                        *value = resolve_env_string(value)?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), MCPError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| MCPError::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path.as_ref(), json)
            .map_err(|e| MCPError::ConfigError(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }
}

/// Resolve environment variable references in strings
///
/// Supports `${VAR}` and `$VAR` syntax.
///
/// # Example
///
/// ```
/// # use mcp_client::config::resolve_env_string;
/// let home = std::env::var("HOME").unwrap_or_default();
/// let result = resolve_env_string("${HOME}/bin")?;
/// assert_eq!(result, format!("{home}/bin"));
/// # Ok::<(), mcp_client::error::MCPError>(())
/// ```
pub fn resolve_env_string(s: &str) -> Result<String, MCPError> {
    let pattern = regex::Regex::new(r"\$(?:\{([A-Za-z_][A-Za-z0-9_]*)\}|([A-Za-z_][A-Za-z0-9_]*))")
        .map_err(|e| MCPError::InvalidPattern(e.to_string()))?;

    let mut result = String::with_capacity(s.len());
    let mut last = 0;

    for cap in pattern.captures_iter(s) {
        let (Some(whole), Some(name)) = (cap.get(0), cap.get(1).or_else(|| cap.get(2))) else {
            continue;
        };
        let value = std::env::var(name.as_str())
            .map_err(|_| MCPError::EnvVarNotFound(name.as_str().to_string()))?;

        result.push_str(&s[last..whole.start()]);
        result.push_str(&value);
        last = whole.end();
    }

    result.push_str(&s[last..]);
    Ok(result)
}
