//! JSON-RPC dispatcher for the tool protocol

use mcp_core::jsonrpc::{JsonRpcError, JsonRpcMessage, JsonRpcRequest, JsonRpcResponse, RequestId};
use mcp_core::{
    CallToolParams, CallToolResult, Implementation, InitializeResult, ListToolsResult,
    PROTOCOL_VERSION, SUPPORTED_PROTOCOL_VERSIONS, ServerCapabilities, ToolsCapability, methods,
};
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info, warn};

use crate::registry::ToolRegistry;

/// Protocol front-end for a [`ToolRegistry`]
///
/// One instance serves one session. It is shared across the tasks that
/// handle individual requests, so all state is atomic.
pub struct McpServer {
    info: Implementation,
    registry: Arc<ToolRegistry>,
    initialized: AtomicBool,
}

impl McpServer {
    pub fn new(info: Implementation, registry: ToolRegistry) -> Self {
        Self::with_shared_registry(info, Arc::new(registry))
    }

    /// Build a server over a registry shared with other sessions
    pub fn with_shared_registry(info: Implementation, registry: Arc<ToolRegistry>) -> Self {
        Self {
            info,
            registry,
            initialized: AtomicBool::new(false),
        }
    }

    pub fn info(&self) -> &Implementation {
        &self.info
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Whether the client has completed the handshake with
    /// `notifications/initialized`
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Handle one line of input, returning the serialized reply if any
    pub async fn handle_line(&self, line: &str) -> Option<String> {
        match serde_json::from_str::<Value>(line) {
            Ok(message) => serialize(&self.handle_message(message).await?),
            Err(e) => parse_error_reply(&e.to_string()),
        }
    }

    /// Handle one decoded message
    ///
    /// Requests always produce a response; notifications and responses
    /// produce none.
    pub async fn handle_message(&self, message: Value) -> Option<JsonRpcResponse> {
        let fallback_id = message
            .get("id")
            .cloned()
            .and_then(|id| serde_json::from_value::<RequestId>(id).ok());

        match JsonRpcMessage::from_value(message) {
            Ok(JsonRpcMessage::Request(request)) => {
                let id = request.id.clone()?;
                Some(match self.handle_request(request).await {
                    Ok(result) => JsonRpcResponse::success(id, result),
                    Err(error) => JsonRpcResponse::failure(Some(id), error),
                })
            }
            Ok(JsonRpcMessage::Notification(notification)) => {
                self.handle_notification(&notification);
                None
            }
            Ok(JsonRpcMessage::Response(response)) => {
                debug!("Ignoring client response for id {:?}", response.id);
                None
            }
            Err(error) => {
                warn!("Rejecting malformed message: {}", error);
                Some(JsonRpcResponse::failure(fallback_id, error))
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> Result<Value, JsonRpcError> {
        debug!("Handling request: {}", request.method);

        match request.method.as_str() {
            methods::INITIALIZE => self.initialize(request.params),
            methods::PING => Ok(json!({})),
            methods::TOOLS_LIST => {
                self.warn_if_uninitialized(methods::TOOLS_LIST);
                to_result(&ListToolsResult {
                    tools: self.registry.list_tools(),
                    next_cursor: None,
                })
            }
            methods::TOOLS_CALL => {
                self.warn_if_uninitialized(methods::TOOLS_CALL);
                let params: CallToolParams =
                    serde_json::from_value(request.params.unwrap_or(Value::Null))
                        .map_err(|e| JsonRpcError::invalid_params(e.to_string()))?;
                let arguments = params.arguments.map_or(Value::Null, Value::Object);
                let result: CallToolResult =
                    self.registry.call_tool(&params.name, arguments).await.into();
                to_result(&result)
            }
            other => Err(JsonRpcError::method_not_found(other)),
        }
    }

    fn initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let requested = params
            .as_ref()
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str);
        let client = params
            .as_ref()
            .and_then(|p| p.get("clientInfo"))
            .and_then(|c| c.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");

        let protocol_version = match requested {
            Some(v) if SUPPORTED_PROTOCOL_VERSIONS.contains(&v) => v,
            _ => PROTOCOL_VERSION,
        };

        if self.is_initialized() {
            warn!("Client '{}' sent initialize after the handshake completed", client);
        }
        info!(
            "Initialize from '{}' (protocol {})",
            client, protocol_version
        );

        to_result(&InitializeResult {
            protocol_version: protocol_version.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: self.info.clone(),
        })
    }

    fn handle_notification(&self, notification: &JsonRpcRequest) {
        match notification.method.as_str() {
            methods::INITIALIZED => {
                if self.initialized.swap(true, Ordering::AcqRel) {
                    debug!("Duplicate initialized notification");
                } else {
                    info!("Session initialized");
                }
            }
            methods::CANCELLED => debug!("Ignoring cancellation notice"),
            other => debug!("Ignoring notification: {}", other),
        }
    }

    fn warn_if_uninitialized(&self, method: &str) {
        if !self.is_initialized() {
            warn!("Received {} before the handshake completed", method);
        }
    }
}

/// Serialized -32700 reply (`id: null`) for input that is not a JSON message
pub fn parse_error_reply(reason: &str) -> Option<String> {
    warn!("Discarding unparseable message: {}", reason);
    serialize(&JsonRpcResponse::failure(None, JsonRpcError::parse_error(reason)))
}

fn serialize(response: &JsonRpcResponse) -> Option<String> {
    match serde_json::to_string(response) {
        Ok(text) => Some(text),
        Err(e) => {
            warn!("Failed to serialize response: {}", e);
            None
        }
    }
}

fn to_result<T: serde::Serialize>(value: &T) -> Result<Value, JsonRpcError> {
    serde_json::to_value(value).map_err(|e| JsonRpcError::internal_error(e.to_string()))
}
