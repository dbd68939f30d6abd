//! MCP client implementations
//!
//! [`McpSession`] owns the protocol rules (handshake, lifecycle, timeouts)
//! and drives a [`Transport`], which only knows how to move JSON-RPC
//! messages. The stdio, HTTP and SSE clients are sessions over their
//! respective transports.

use async_trait::async_trait;
use mcp_core::jsonrpc::JsonRpcResponse;
use mcp_core::schema::json_type_name;
use mcp_core::{
    CallToolParams, CallToolResult, Implementation, InitializeResult, ListToolsResult,
    PROTOCOL_VERSION, RequestId, SUPPORTED_PROTOCOL_VERSIONS, ServerCapabilities,
    ToolDescriptor, methods,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::Result;
use crate::config::MCPServerConfig;
use crate::error::MCPError;
use crate::session::{SessionGate, SessionState};

pub mod events;
pub mod http;
pub mod manager;
pub mod sse;
pub mod stdio;
#[cfg(test)]
mod testing;

pub use http::HttpMCPClient;
pub use sse::SseMCPClient;
pub use stdio::StdioMCPClient;

/// MCP client trait - abstracts over different transports
///
/// All methods take `&self` so a client can be shared through an `Arc`;
/// implementations use interior mutability for state changes.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MCPClient: Send + Sync {
    /// Open the channel and perform the `initialize` handshake
    ///
    /// A no-op on an initialized session. A failed handshake closes the
    /// session; build a new client to try again.
    async fn initialize(&self) -> Result<()>;

    /// Current lifecycle state
    fn state(&self) -> SessionState;

    fn is_initialized(&self) -> bool {
        self.state() == SessionState::Initialized
    }

    /// Release the channel; later calls fail with `SessionClosed`
    async fn close(&self) -> Result<()>;

    /// Every tool the server advertises, in server order
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>>;

    /// Invoke a tool by name
    ///
    /// Tool-level failures come back as a result with `isError` set; `Err`
    /// means the session itself could not carry the call.
    async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult>;

    /// Server info (from initialize response)
    async fn server_info(&self) -> Option<MCPServerInfo>;
}

/// Type alias for Arc-wrapped MCP client
pub type ArcMCPClient = Arc<dyn MCPClient>;

/// MCP server info (from initialize)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MCPServerInfo {
    pub name: String,
    pub version: String,
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
}

impl From<InitializeResult> for MCPServerInfo {
    fn from(result: InitializeResult) -> Self {
        Self {
            name: result.server_info.name,
            version: result.server_info.version,
            protocol_version: result.protocol_version,
            capabilities: result.capabilities,
        }
    }
}

/// Moves JSON-RPC messages to and from one server
///
/// Transports do not enforce the session lifecycle or timeouts; the
/// [`McpSession`] wrapping them does.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Establish the underlying channel (spawn, connect, ...)
    async fn open(&self) -> Result<()>;

    /// Send a request and wait for the matching response's `result`
    async fn request(&self, method: &str, params: Value) -> Result<Value>;

    /// Send a notification
    async fn notify(&self, method: &str, params: Option<Value>) -> Result<()>;

    /// Tear the channel down; must be safe to call more than once
    async fn shutdown(&self);

    /// Human-readable endpoint, for logs
    fn describe(&self) -> String;
}

/// Protocol session over any [`Transport`]
pub struct McpSession<T> {
    transport: T,
    gate: SessionGate,
    timeout: Duration,
    client_info: Implementation,
    server_info: RwLock<Option<MCPServerInfo>>,
    handshake_lock: Mutex<()>,
}

impl<T: Transport> McpSession<T> {
    /// Wrap a transport; `timeout` bounds the handshake and each request
    pub fn new(transport: T, timeout: Duration) -> Self {
        let app = mcp_utils::Config::default();
        Self {
            transport,
            gate: SessionGate::new(),
            timeout,
            client_info: Implementation::new(app.app_name, app.version),
            server_info: RwLock::new(None),
            handshake_lock: Mutex::new(()),
        }
    }

    /// Identify as someone else during the handshake
    pub fn with_client_info(mut self, client_info: Implementation) -> Self {
        self.client_info = client_info;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        match tokio::time::timeout(self.timeout, self.transport.request(method, params)).await {
            Ok(result) => result,
            Err(_) => Err(MCPError::Timeout(format!(
                "{} got no response within {:?}",
                method, self.timeout
            ))),
        }
    }

    async fn handshake(&self) -> Result<MCPServerInfo> {
        self.transport.open().await?;

        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": self.client_info,
        });
        let result = self.transport.request(methods::INITIALIZE, params).await?;
        let result: InitializeResult = serde_json::from_value(result).map_err(|e| {
            MCPError::InitializationFailed(format!("malformed initialize result: {e}"))
        })?;

        if !SUPPORTED_PROTOCOL_VERSIONS.contains(&result.protocol_version.as_str()) {
            return Err(MCPError::InitializationFailed(format!(
                "server speaks unsupported protocol version {}",
                result.protocol_version
            )));
        }

        self.transport.notify(methods::INITIALIZED, None).await?;
        Ok(result.into())
    }
}

#[async_trait]
impl<T: Transport> MCPClient for McpSession<T> {
    async fn initialize(&self) -> Result<()> {
        let _handshake = self.handshake_lock.lock().await;

        match self.gate.state() {
            SessionState::Initialized => return Ok(()),
            SessionState::Closed => return Err(MCPError::SessionClosed),
            SessionState::Uninitialized => {}
        }

        let endpoint = self.transport.describe();
        debug!("Initializing MCP session with {}", endpoint);

        let outcome = match tokio::time::timeout(self.timeout, self.handshake()).await {
            Ok(outcome) => outcome,
            Err(_) => Err(MCPError::Timeout(format!(
                "initialize did not complete within {:?}",
                self.timeout
            ))),
        }
        .and_then(|server_info| {
            self.gate.mark_initialized()?;
            Ok(server_info)
        });

        match outcome {
            Ok(server_info) => {
                info!(
                    "Initialized MCP session with '{}' v{} (protocol {}) over {}",
                    server_info.name, server_info.version, server_info.protocol_version, endpoint
                );
                *self.server_info.write().await = Some(server_info);
                Ok(())
            }
            Err(e) => {
                warn!("MCP handshake with {} failed: {}", endpoint, e);
                self.gate.close();
                self.transport.shutdown().await;
                Err(match e {
                    MCPError::RequestFailed(reason) => MCPError::InitializationFailed(reason),
                    other => other,
                })
            }
        }
    }

    fn state(&self) -> SessionState {
        self.gate.state()
    }

    async fn close(&self) -> Result<()> {
        if self.gate.close() != SessionState::Closed {
            self.transport.shutdown().await;
            info!("Closed MCP session with {}", self.transport.describe());
        }
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        self.gate.ensure_initialized(methods::TOOLS_LIST)?;

        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen_cursors = HashSet::new();

        loop {
            let params = match &cursor {
                Some(cursor) => json!({ "cursor": cursor }),
                None => json!({}),
            };
            let result = self.request(methods::TOOLS_LIST, params).await?;
            let page: ListToolsResult = serde_json::from_value(result).map_err(|e| {
                MCPError::RequestFailed(format!("{}: malformed result: {e}", methods::TOOLS_LIST))
            })?;
            tools.extend(page.tools);

            match page.next_cursor {
                Some(next) if seen_cursors.insert(next.clone()) => cursor = Some(next),
                Some(next) => {
                    warn!("Server repeated page cursor {:?}; stopping pagination", next);
                    break;
                }
                None => break,
            }
        }

        debug!("Server listed {} tools", tools.len());
        Ok(tools)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult> {
        self.gate.ensure_initialized(methods::TOOLS_CALL)?;

        let arguments = match arguments {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(MCPError::ToolCallFailed(format!(
                    "arguments for '{name}' must be a JSON object, got {}",
                    json_type_name(&other)
                )));
            }
        };

        let params = serde_json::to_value(CallToolParams {
            name: name.to_string(),
            arguments: Some(arguments),
        })?;

        debug!("Calling tool: {}", name);
        let result = self.request(methods::TOOLS_CALL, params).await?;
        serde_json::from_value(result).map_err(|e| {
            MCPError::RequestFailed(format!("{}: malformed result: {e}", methods::TOOLS_CALL))
        })
    }

    async fn server_info(&self) -> Option<MCPServerInfo> {
        self.server_info.read().await.clone()
    }
}

/// Build an uninitialized client for a configured server
pub fn create_client(config: &MCPServerConfig) -> Result<ArcMCPClient> {
    let client: ArcMCPClient = match config {
        MCPServerConfig::Stdio { .. } => Arc::new(StdioMCPClient::from_config(config)?),
        MCPServerConfig::Http { .. } => Arc::new(HttpMCPClient::from_config(config)?),
        MCPServerConfig::Sse { .. } => Arc::new(SseMCPClient::from_config(config)?),
    };
    Ok(client)
}

/// Monotonic JSON-RPC id source, starting at 1
#[derive(Debug, Default)]
pub(crate) struct RequestCounter(AtomicU64);

impl RequestCounter {
    pub(crate) fn next(&self) -> RequestId {
        RequestId::from(self.0.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Unwrap a response, turning a JSON-RPC error into `RequestFailed`
pub(crate) fn rpc_result(method: &str, response: JsonRpcResponse) -> Result<Value> {
    response
        .into_result()
        .map_err(|e| MCPError::RequestFailed(format!("{method}: {e}")))
}
