//! MCP client manager for coordinating multiple MCP server connections

use mcp_core::{CallToolResult, ToolDescriptor};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use super::{ArcMCPClient, create_client};
use crate::Result;
use crate::config::{MCPConfig, MCPServerConfig};
use crate::error::MCPError;
use crate::retry::RetryPolicy;

/// Information about an MCP tool including its source server
#[derive(Debug, Clone, PartialEq)]
pub struct MCPToolInfo {
    pub server_name: String,
    pub definition: ToolDescriptor,
}

/// What `initialize` does when one server cannot be reached
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectPolicy {
    /// Abort, closing sessions already opened
    #[default]
    FailFast,
    /// Log the failure and carry on with the servers that did connect
    BestEffort,
}

/// Builds an uninitialized client for a server config
pub type ClientFactory = Arc<dyn Fn(&MCPServerConfig) -> Result<ArcMCPClient> + Send + Sync>;

/// Manages one session per configured MCP server
///
/// The manager handles:
/// - Connection lifecycle for every server in the config
/// - Tool discovery across all connected servers
/// - Tool execution routing to the correct server
pub struct MCPClientManager {
    config: Arc<MCPConfig>,

    /// Active clients (server_name -> client), ordered by name
    clients: RwLock<BTreeMap<String, ArcMCPClient>>,

    policy: ConnectPolicy,
    retry_policy: RetryPolicy,
    factory: ClientFactory,
}

impl MCPClientManager {
    pub fn new(config: Arc<MCPConfig>) -> Self {
        Self {
            config,
            clients: RwLock::new(BTreeMap::new()),
            policy: ConnectPolicy::default(),
            retry_policy: RetryPolicy::default(),
            factory: Arc::new(create_client),
        }
    }

    pub fn with_policy(mut self, policy: ConnectPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Replace how clients are built (custom transports, test doubles)
    pub fn with_client_factory(
        mut self,
        factory: impl Fn(&MCPServerConfig) -> Result<ArcMCPClient> + Send + Sync + 'static,
    ) -> Self {
        self.factory = Arc::new(factory);
        self
    }

    pub fn config(&self) -> &MCPConfig {
        &self.config
    }

    /// Connect to every configured server, in name order
    ///
    /// Under [`ConnectPolicy::FailFast`] the first failure closes whatever
    /// was opened and is returned. Under [`ConnectPolicy::BestEffort`]
    /// failures are logged and skipped.
    pub async fn initialize(&self) -> Result<()> {
        let mut servers: Vec<(&String, &MCPServerConfig)> = self.config.mcp_servers.iter().collect();
        servers.sort_by(|a, b| a.0.cmp(b.0));

        let mut connected = 0;
        for (server_name, server_config) in &servers {
            match self.connect(server_name, server_config).await {
                Ok(client) => {
                    info!(
                        "Connected to MCP server '{}' over {}",
                        server_name,
                        server_config.transport_name()
                    );
                    self.clients.write().await.insert((*server_name).clone(), client);
                    connected += 1;
                }
                Err(e) if self.policy == ConnectPolicy::FailFast => {
                    error!("Failed to connect to MCP server '{}': {}", server_name, e);
                    self.shutdown().await?;
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        "Failed to connect to MCP server '{}': {}. Continuing without it.",
                        server_name, e
                    );
                }
            }
        }

        if connected == 0 && !servers.is_empty() {
            warn!("No MCP servers connected");
        } else {
            info!("Connected to {}/{} MCP servers", connected, servers.len());
        }

        Ok(())
    }

    /// Build and initialize a fresh client, retrying transient failures
    async fn connect(&self, server_name: &str, config: &MCPServerConfig) -> Result<ArcMCPClient> {
        let factory = &self.factory;
        self.retry_policy
            .execute(&format!("connect to {server_name}"), move || async move {
                let client = factory(config)?;
                client.initialize().await?;
                Ok(client)
            })
            .await
    }

    fn snapshot(clients: &BTreeMap<String, ArcMCPClient>) -> Vec<(String, ArcMCPClient)> {
        clients
            .iter()
            .map(|(name, client)| (name.clone(), Arc::clone(client)))
            .collect()
    }

    /// Discover all tools from all connected servers
    ///
    /// A server that fails to list is logged and left out.
    pub async fn discover_tools(&self) -> Result<Vec<MCPToolInfo>> {
        let clients = Self::snapshot(&*self.clients.read().await);
        let mut all_tools = Vec::new();

        for (server_name, client) in clients {
            match client.list_tools().await {
                Ok(tools) => {
                    info!(
                        "Discovered {} tools from server: {}",
                        tools.len(),
                        server_name
                    );
                    all_tools.extend(tools.into_iter().map(|definition| MCPToolInfo {
                        server_name: server_name.clone(),
                        definition,
                    }));
                }
                Err(e) => {
                    warn!("Failed to list tools from {}: {}", server_name, e);
                }
            }
        }

        Ok(all_tools)
    }

    /// Call a tool on a named server
    pub async fn call_tool(
        &self,
        server_name: &str,
        tool_name: &str,
        arguments: Value,
    ) -> Result<CallToolResult> {
        let client = self
            .get_client(server_name)
            .await
            .ok_or_else(|| MCPError::ServerNotFound(server_name.to_string()))?;

        client.call_tool(tool_name, arguments).await
    }

    /// Get a specific client by server name
    pub async fn get_client(&self, server_name: &str) -> Option<ArcMCPClient> {
        self.clients.read().await.get(server_name).cloned()
    }

    /// Connected server names, sorted
    pub async fn connected_servers(&self) -> Vec<String> {
        self.clients.read().await.keys().cloned().collect()
    }

    pub async fn has_connections(&self) -> bool {
        !self.clients.read().await.is_empty()
    }

    /// Close every session and forget the clients
    pub async fn shutdown(&self) -> Result<()> {
        let clients = std::mem::take(&mut *self.clients.write().await);

        for (server_name, client) in clients {
            info!("Closing MCP session: {}", server_name);
            if let Err(e) = client.close().await {
                warn!("Error closing session with {}: {}", server_name, e);
            }
        }

        Ok(())
    }

    /// Replace a server's session with a freshly initialized one
    pub async fn reconnect(&self, server_name: &str) -> Result<()> {
        let server_config = self
            .config
            .mcp_servers
            .get(server_name)
            .ok_or_else(|| MCPError::ServerNotFound(server_name.to_string()))?;

        info!("Reconnecting to MCP server: {}", server_name);

        let old = self.clients.write().await.remove(server_name);
        if let Some(old) = old {
            if let Err(e) = old.close().await {
                warn!("Error closing old session with {}: {}", server_name, e);
            }
        }

        let client = self.connect(server_name, server_config).await?;
        self.clients
            .write()
            .await
            .insert(server_name.to_string(), client);

        info!("Successfully reconnected to MCP server: {}", server_name);
        Ok(())
    }

    /// Whether each connected server's session is still initialized
    pub async fn health_check(&self) -> BTreeMap<String, bool> {
        let clients = self.clients.read().await;
        let mut status = BTreeMap::new();

        for (server_name, client) in clients.iter() {
            let healthy = client.is_initialized();
            if !healthy {
                warn!("Server {} is not initialized ({})", server_name, client.state());
            }
            status.insert(server_name.clone(), healthy);
        }

        status
    }
}
