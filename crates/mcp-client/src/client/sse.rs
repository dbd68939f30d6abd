//! SSE transport MCP client
//!
//! The client holds a GET event stream open. The server's first `endpoint`
//! event names the URL to POST messages to; responses come back as
//! `message` events on the stream and are routed to waiting callers by
//! request id, so concurrent requests share one stream.

use async_trait::async_trait;
use futures::StreamExt;
use mcp_core::jsonrpc::{JsonRpcMessage, JsonRpcRequest, JsonRpcResponse};
use mcp_core::RequestId;
use reqwest::header::{ACCEPT, HeaderMap};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use super::events::{SseDecoder, SseEvent};
use super::http::{build_headers, parse_url};
use super::{McpSession, RequestCounter, Transport, rpc_result};
use crate::Result;
use crate::config::MCPServerConfig;
use crate::error::MCPError;

/// MCP client using the HTTP+SSE transport
pub type SseMCPClient = McpSession<SseTransport>;

impl SseMCPClient {
    /// Create a client for the event stream at `url`
    pub fn sse(url: &str, headers: HashMap<String, String>, timeout: Duration) -> Result<Self> {
        Ok(McpSession::new(SseTransport::new(url, headers, timeout)?, timeout))
    }

    /// Create from MCPServerConfig
    pub fn from_config(config: &MCPServerConfig) -> Result<Self> {
        match config {
            MCPServerConfig::Sse { url, headers, .. } => {
                Self::sse(url, headers.clone(), config.timeout())
            }
            _ => Err(MCPError::ConfigError(
                "Expected SSE transport config".to_string(),
            )),
        }
    }
}

type PendingMap = HashMap<RequestId, oneshot::Sender<JsonRpcResponse>>;

/// Callers waiting for a response, keyed by request id
#[derive(Default, Clone)]
struct Pending(Arc<StdMutex<PendingMap>>);

impl Pending {
    fn lock(&self) -> std::sync::MutexGuard<'_, PendingMap> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, id: RequestId) -> (PendingGuard, oneshot::Receiver<JsonRpcResponse>) {
        let (tx, rx) = oneshot::channel();
        self.lock().insert(id.clone(), tx);
        (
            PendingGuard {
                pending: self.clone(),
                id,
            },
            rx,
        )
    }

    fn resolve(&self, response: JsonRpcResponse) {
        let Some(id) = response.id.clone() else {
            warn!("Dropping response without id: {:?}", response.error);
            return;
        };

        match self.lock().remove(&id) {
            // The receiver may have timed out already
            Some(waiter) => {
                let _ = waiter.send(response);
            }
            None => debug!("No caller waiting for response {}", id),
        }
    }

    /// Drop every waiter; their receivers observe a closed channel
    fn fail_all(&self) {
        let dropped = std::mem::take(&mut *self.lock());
        if !dropped.is_empty() {
            debug!("Failing {} pending requests", dropped.len());
        }
    }
}

/// Removes a waiter when its request finishes or is abandoned
struct PendingGuard {
    pending: Pending,
    id: RequestId,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.id);
    }
}

/// JSON-RPC over an SSE stream (server to client) plus POSTs (client to server)
pub struct SseTransport {
    url: Url,
    headers: HeaderMap,
    http_client: reqwest::Client,
    timeout: Duration,
    endpoint: RwLock<Option<Url>>,
    pending: Pending,
    reader: Mutex<Option<JoinHandle<()>>>,
    request_ids: RequestCounter,
}

impl SseTransport {
    pub fn new(url: &str, headers: HashMap<String, String>, timeout: Duration) -> Result<Self> {
        let url = parse_url(url)?;
        let headers = build_headers(&headers)?;
        // No overall timeout: the event stream stays open for the whole session
        let http_client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| MCPError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url,
            headers,
            http_client,
            timeout,
            endpoint: RwLock::new(None),
            pending: Pending::default(),
            reader: Mutex::new(None),
            request_ids: RequestCounter::default(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// POST target announced by the server, once connected
    pub async fn endpoint(&self) -> Option<Url> {
        self.endpoint.read().await.clone()
    }

    async fn post(&self, message: &JsonRpcRequest) -> Result<()> {
        let endpoint = self
            .endpoint
            .read()
            .await
            .clone()
            .ok_or_else(|| MCPError::ConnectionFailed("SSE endpoint not known yet".to_string()))?;

        let response = self
            .http_client
            .post(endpoint)
            .headers(self.headers.clone())
            .timeout(self.timeout)
            .json(message)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    MCPError::Timeout(format!("POST {}", message.method))
                } else {
                    MCPError::ConnectionFailed(format!("HTTP request failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MCPError::RequestFailed(format!(
                "{}: HTTP {}: {}",
                message.method, status, body
            )));
        }

        Ok(())
    }
}

/// Route one decoded event; returns the endpoint URL for `endpoint` events
fn dispatch_event(base: &Url, event: SseEvent, pending: &Pending) -> Option<Url> {
    match event.event.as_str() {
        "endpoint" => match base.join(event.data.trim()) {
            Ok(endpoint) => Some(endpoint),
            Err(e) => {
                warn!("Ignoring invalid endpoint '{}': {}", event.data, e);
                None
            }
        },
        "message" => {
            let value: Value = match serde_json::from_str(&event.data) {
                Ok(value) => value,
                Err(e) => {
                    warn!("Skipping non-JSON SSE message: {}", e);
                    return None;
                }
            };

            match JsonRpcMessage::from_value(value) {
                Ok(JsonRpcMessage::Response(response)) => pending.resolve(response),
                Ok(JsonRpcMessage::Notification(notification)) => {
                    debug!("Server notification: {}", notification.method);
                }
                Ok(JsonRpcMessage::Request(request)) => {
                    debug!("Ignoring server request over SSE: {}", request.method);
                }
                Err(e) => warn!("Skipping malformed SSE message: {}", e),
            }
            None
        }
        other => {
            debug!("Ignoring SSE event type: {}", other);
            None
        }
    }
}

async fn read_stream(
    base: Url,
    response: reqwest::Response,
    pending: Pending,
    endpoint_tx: oneshot::Sender<Url>,
) {
    let mut endpoint_tx = Some(endpoint_tx);
    let mut decoder = SseDecoder::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("SSE stream from {} failed: {}", base, e);
                break;
            }
        };

        for event in decoder.push(&chunk) {
            if let Some(endpoint) = dispatch_event(&base, event, &pending) {
                match endpoint_tx.take() {
                    Some(tx) => {
                        let _ = tx.send(endpoint);
                    }
                    None => debug!("Ignoring repeated endpoint event"),
                }
            }
        }
    }

    info!("SSE stream from {} closed", base);
    pending.fail_all();
}

#[async_trait]
impl Transport for SseTransport {
    async fn open(&self) -> Result<()> {
        let mut reader = self.reader.lock().await;
        if reader.is_some() {
            return Ok(());
        }

        debug!("Opening SSE stream: {}", self.url);
        let response = self
            .http_client
            .get(self.url.clone())
            .headers(self.headers.clone())
            .header(ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(|e| MCPError::ConnectionFailed(format!("SSE connect failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MCPError::ConnectionFailed(format!(
                "SSE connect to {} returned HTTP {}",
                self.url, status
            )));
        }

        let (endpoint_tx, endpoint_rx) = oneshot::channel();
        let task = tokio::spawn(read_stream(
            self.url.clone(),
            response,
            self.pending.clone(),
            endpoint_tx,
        ));

        let endpoint = match tokio::time::timeout(self.timeout, endpoint_rx).await {
            Ok(Ok(endpoint)) => endpoint,
            Ok(Err(_)) => {
                task.abort();
                return Err(MCPError::ConnectionFailed(
                    "SSE stream ended before announcing an endpoint".to_string(),
                ));
            }
            Err(_) => {
                task.abort();
                return Err(MCPError::Timeout(format!(
                    "no endpoint event from {} within {:?}",
                    self.url, self.timeout
                )));
            }
        };

        info!("SSE stream open; posting messages to {}", endpoint);
        *self.endpoint.write().await = Some(endpoint);
        *reader = Some(task);
        Ok(())
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.request_ids.next();
        let (_guard, rx) = self.pending.register(id.clone());

        debug!("Sending SSE request {}: {}", id, method);
        self.post(&JsonRpcRequest::new(id, method, params)).await?;

        let response = rx.await.map_err(|_| {
            MCPError::ConnectionFailed(format!("SSE stream closed before {} was answered", method))
        })?;
        rpc_result(method, response)
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        self.post(&JsonRpcRequest::notification(method, params)).await
    }

    async fn shutdown(&self) {
        if let Some(task) = self.reader.lock().await.take() {
            task.abort();
        }
        self.pending.fail_all();
        *self.endpoint.write().await = None;
    }

    fn describe(&self) -> String {
        format!("sse:{}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_core::jsonrpc::JsonRpcError;

    fn base() -> Url {
        Url::parse("http://localhost:8000/sse").unwrap()
    }

    fn message(data: &str) -> SseEvent {
        SseEvent {
            event: "message".to_string(),
            data: data.to_string(),
            id: None,
        }
    }

    #[test]
    fn test_endpoint_is_resolved_against_stream_url() {
        let event = SseEvent {
            event: "endpoint".to_string(),
            data: "/messages/?session_id=abc".to_string(),
            id: None,
        };

        let endpoint = dispatch_event(&base(), event, &Pending::default()).unwrap();
        assert_eq!(endpoint.as_str(), "http://localhost:8000/messages/?session_id=abc");
    }

    #[tokio::test]
    async fn test_responses_are_routed_by_id() {
        let pending = Pending::default();
        let (_first_guard, first) = pending.register(RequestId::Number(1));
        let (_second_guard, second) = pending.register(RequestId::Number(2));

        // Out of order on purpose
        dispatch_event(&base(), message(r#"{"jsonrpc":"2.0","id":2,"result":{"n":2}}"#), &pending);
        dispatch_event(&base(), message(r#"{"jsonrpc":"2.0","method":"notifications/message"}"#), &pending);
        dispatch_event(&base(), message(r#"{"jsonrpc":"2.0","id":1,"result":{"n":1}}"#), &pending);

        assert_eq!(first.await.unwrap().into_result().unwrap()["n"], 1);
        assert_eq!(second.await.unwrap().into_result().unwrap()["n"], 2);
    }

    #[tokio::test]
    async fn test_error_response_reaches_caller() {
        let pending = Pending::default();
        let (_guard, rx) = pending.register(RequestId::Number(5));

        let response = JsonRpcResponse::failure(
            Some(RequestId::Number(5)),
            JsonRpcError::method_not_found("tools/frobnicate"),
        );
        dispatch_event(&base(), message(&serde_json::to_string(&response).unwrap()), &pending);

        let err = rpc_result("tools/frobnicate", rx.await.unwrap()).unwrap_err();
        assert!(matches!(err, MCPError::RequestFailed(_)));
    }

    #[tokio::test]
    async fn test_fail_all_wakes_waiters() {
        let pending = Pending::default();
        let (_guard, rx) = pending.register(RequestId::Number(1));

        pending.fail_all();
        assert!(rx.await.is_err());
    }

    #[test]
    fn test_guard_removes_abandoned_waiter() {
        let pending = Pending::default();
        {
            let (_guard, _rx) = pending.register(RequestId::Number(9));
            assert_eq!(pending.lock().len(), 1);
        }
        assert!(pending.lock().is_empty());
    }

    #[test]
    fn test_from_config() {
        let config = MCPServerConfig::Sse {
            url: "http://localhost:8000/sse".to_string(),
            headers: HashMap::new(),
            timeout_secs: 15,
        };

        let client = SseMCPClient::from_config(&config).unwrap();
        assert_eq!(client.transport().url().as_str(), "http://localhost:8000/sse");
        assert_eq!(client.timeout(), Duration::from_secs(15));

        let http = MCPServerConfig::Http {
            url: "http://localhost:8000/mcp".to_string(),
            headers: HashMap::new(),
            timeout_secs: 15,
        };
        assert!(matches!(SseMCPClient::from_config(&http), Err(MCPError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_session_over_local_event_stream() {
        use crate::client::MCPClient;
        use serde_json::json;

        let url = crate::client::testing::spawn_sse_server().await;
        let client = Arc::new(SseMCPClient::sse(&url, HashMap::new(), Duration::from_secs(5)).unwrap());

        client.initialize().await.unwrap();
        let endpoint = client.transport().endpoint().await.unwrap();
        assert_eq!(endpoint.path(), "/messages");
        assert_eq!(endpoint.query(), Some("sessionId=1"));
        assert_eq!(client.server_info().await.unwrap().name, "math-server");

        let names: Vec<_> = client.list_tools().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["add", "multiply"]);

        // Responses arrive on the shared stream and must reach the right caller
        let mut handles = Vec::new();
        for i in 0..4 {
            let client = Arc::clone(&client);
            handles.push(tokio::spawn(async move {
                let result = client.call_tool("multiply", json!({"a": i, "b": 2})).await.unwrap();
                result.first_text().unwrap_or_default().to_string()
            }));
        }
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap(), format!("{}.0 * 2.0 = {}.0", i, i * 2));
        }

        client.close().await.unwrap();
        assert!(client.transport().endpoint().await.is_none());
    }
}
