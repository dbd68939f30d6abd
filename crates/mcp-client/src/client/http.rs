//! HTTP transport MCP client
//!
//! Every JSON-RPC message is a POST to one endpoint. The server may answer a
//! request with a plain JSON body or with a short `text/event-stream` whose
//! `message` events carry the response.

use async_trait::async_trait;
use mcp_core::jsonrpc::{JsonRpcMessage, JsonRpcRequest, JsonRpcResponse};
use mcp_core::RequestId;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use super::events::decode_body;
use super::{McpSession, RequestCounter, Transport, rpc_result};
use crate::Result;
use crate::config::MCPServerConfig;
use crate::error::MCPError;

/// Header carrying the server-assigned session id
pub const SESSION_ID_HEADER: &str = "mcp-session-id";

/// MCP client using the streamable HTTP transport
pub type HttpMCPClient = McpSession<HttpTransport>;

impl HttpMCPClient {
    /// Create a client for `url`; the URL is validated here, contacted on `initialize`
    pub fn http(url: &str, headers: HashMap<String, String>, timeout: Duration) -> Result<Self> {
        Ok(McpSession::new(HttpTransport::new(url, headers, timeout)?, timeout))
    }

    /// Create from MCPServerConfig
    pub fn from_config(config: &MCPServerConfig) -> Result<Self> {
        match config {
            MCPServerConfig::Http { url, headers, .. } => {
                Self::http(url, headers.clone(), config.timeout())
            }
            _ => Err(MCPError::ConfigError(
                "Expected HTTP transport config".to_string(),
            )),
        }
    }
}

/// Build the header map shared by every request, rejecting invalid entries
pub(crate) fn build_headers(headers: &HashMap<String, String>) -> Result<HeaderMap> {
    let mut header_map = HeaderMap::new();

    for (key, value) in headers {
        let name = HeaderName::from_str(key).map_err(|e| {
            MCPError::ConfigError(format!("Invalid header name '{}': {}", key, e))
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            MCPError::ConfigError(format!("Invalid header value for '{}': {}", key, e))
        })?;
        header_map.insert(name, value);
    }

    Ok(header_map)
}

pub(crate) fn parse_url(url: &str) -> Result<Url> {
    Url::parse(url).map_err(|e| MCPError::ConfigError(format!("Invalid server URL '{}': {}", url, e)))
}

/// JSON-RPC over HTTP POST
pub struct HttpTransport {
    url: Url,
    headers: HeaderMap,
    http_client: reqwest::Client,
    session_id: RwLock<Option<String>>,
    request_ids: RequestCounter,
}

impl HttpTransport {
    pub fn new(url: &str, headers: HashMap<String, String>, timeout: Duration) -> Result<Self> {
        let url = parse_url(url)?;
        let headers = build_headers(&headers)?;
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MCPError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            url,
            headers,
            http_client,
            session_id: RwLock::new(None),
            request_ids: RequestCounter::default(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Session id assigned by the server during the handshake, if any
    pub async fn session_id(&self) -> Option<String> {
        self.session_id.read().await.clone()
    }

    async fn post(&self, message: &JsonRpcRequest) -> Result<reqwest::Response> {
        let mut request = self
            .http_client
            .post(self.url.clone())
            .headers(self.headers.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json, text/event-stream")
            .json(message);

        if let Some(session_id) = self.session_id.read().await.as_deref() {
            request = request.header(SESSION_ID_HEADER, session_id);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                MCPError::Timeout(format!("{} to {}", message.method, self.url))
            } else {
                MCPError::ConnectionFailed(format!("HTTP request failed: {}", e))
            }
        })?;

        if let Some(session_id) = response
            .headers()
            .get(SESSION_ID_HEADER)
            .and_then(|value| value.to_str().ok())
        {
            let mut current = self.session_id.write().await;
            if current.as_deref() != Some(session_id) {
                debug!("Server assigned session id {}", session_id);
                *current = Some(session_id.to_string());
            }
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MCPError::RequestFailed(format!(
                "{}: HTTP {}: {}",
                message.method, status, body
            )));
        }

        Ok(response)
    }
}

/// Find the response for `id` in a POST reply body
pub(crate) fn response_from_body(
    content_type: &str,
    body: &str,
    id: &RequestId,
) -> Result<JsonRpcResponse> {
    let candidates: Vec<Value> = if content_type.starts_with("text/event-stream") {
        decode_body(body)
            .into_iter()
            .filter(|event| event.event == "message")
            .filter_map(|event| match serde_json::from_str(&event.data) {
                Ok(value) => Some(value),
                Err(e) => {
                    warn!("Skipping non-JSON event data: {}", e);
                    None
                }
            })
            .collect()
    } else {
        match serde_json::from_str(body)? {
            Value::Array(batch) => batch,
            single => vec![single],
        }
    };

    candidates
        .into_iter()
        .filter_map(|value| match JsonRpcMessage::from_value(value) {
            Ok(JsonRpcMessage::Response(response)) => Some(response),
            _ => None,
        })
        .find(|response| response.id.as_ref() == Some(id))
        .ok_or_else(|| MCPError::RequestFailed(format!("No response for request {id} in reply body")))
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self) -> Result<()> {
        // Stateless until the first POST
        Ok(())
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.request_ids.next();
        let request = JsonRpcRequest::new(id.clone(), method, params);

        debug!("Sending HTTP request to {}: {}", self.url, method);
        let response = self.post(&request).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("application/json")
            .to_string();
        let body = response
            .text()
            .await
            .map_err(|e| MCPError::ConnectionFailed(format!("Failed to read response body: {}", e)))?;

        let response = response_from_body(&content_type, &body, &id)?;
        debug!("Received response for: {}", method);
        rpc_result(method, response)
    }

    async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        self.post(&JsonRpcRequest::notification(method, params))
            .await
            .map(|_| ())
    }

    async fn shutdown(&self) {
        let Some(session_id) = self.session_id.write().await.take() else {
            return;
        };

        // Servers that track sessions accept a DELETE to end them
        let result = self
            .http_client
            .delete(self.url.clone())
            .headers(self.headers.clone())
            .header(SESSION_ID_HEADER, &session_id)
            .send()
            .await;

        match result {
            Ok(response) => info!("Ended HTTP session {} ({})", session_id, response.status()),
            Err(e) => debug!("Failed to end HTTP session {}: {}", session_id, e),
        }
    }

    fn describe(&self) -> String {
        format!("http:{}", self.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MCPClient;
    use crate::session::SessionState;

    #[test]
    fn test_from_config() {
        let config = MCPServerConfig::Http {
            url: "http://localhost:8080/mcp".to_string(),
            headers: HashMap::from([("Authorization".to_string(), "Bearer t".to_string())]),
            timeout_secs: 10,
        };

        let client = HttpMCPClient::from_config(&config).unwrap();
        assert_eq!(client.transport().url().as_str(), "http://localhost:8080/mcp");
        assert_eq!(client.timeout(), Duration::from_secs(10));
        assert_eq!(client.state(), SessionState::Uninitialized);
    }

    #[test]
    fn test_from_config_rejects_other_transports() {
        let config = MCPServerConfig::stdio("math-server", vec![]);
        assert!(matches!(
            HttpMCPClient::from_config(&config),
            Err(MCPError::ConfigError(_))
        ));
    }

    #[test]
    fn test_invalid_url_and_headers() {
        assert!(matches!(
            HttpTransport::new("not a url", HashMap::new(), Duration::from_secs(1)),
            Err(MCPError::ConfigError(_))
        ));

        let headers = HashMap::from([("bad header".to_string(), "v".to_string())]);
        assert!(matches!(
            HttpTransport::new("http://localhost/mcp", headers, Duration::from_secs(1)),
            Err(MCPError::ConfigError(_))
        ));
    }

    #[test]
    fn test_json_body() {
        let body = r#"{"jsonrpc":"2.0","id":3,"result":{"tools":[]}}"#;
        let response = response_from_body("application/json", body, &RequestId::Number(3)).unwrap();
        assert_eq!(response.into_result().unwrap()["tools"], serde_json::json!([]));
    }

    #[test]
    fn test_event_stream_body() {
        let body = "event: message\ndata: {\"jsonrpc\":\"2.0\",\"method\":\"notifications/progress\"}\n\n\
                    event: message\ndata: {\"jsonrpc\":\"2.0\",\"id\":7,\"result\":{}}\n\n";
        let response =
            response_from_body("text/event-stream; charset=utf-8", body, &RequestId::Number(7)).unwrap();
        assert_eq!(response.id, Some(RequestId::Number(7)));
    }

    #[test]
    fn test_body_without_matching_response() {
        let body = r#"{"jsonrpc":"2.0","id":1,"result":{}}"#;
        let err = response_from_body("application/json", body, &RequestId::Number(2)).unwrap_err();
        assert!(matches!(err, MCPError::RequestFailed(_)));
    }

    #[tokio::test]
    async fn test_unreachable_server_closes_session() {
        // Port 9 (discard) on localhost is essentially never listening
        let client =
            HttpMCPClient::http("http://127.0.0.1:9/mcp", HashMap::new(), Duration::from_secs(2)).unwrap();

        let err = client.initialize().await.unwrap_err();
        assert!(matches!(err, MCPError::ConnectionFailed(_) | MCPError::Timeout(_)));
        assert_eq!(client.state(), SessionState::Closed);
    }

    #[tokio::test]
    async fn test_session_against_local_server() {
        let (url, log) = crate::client::testing::spawn_http_server().await;
        let client = HttpMCPClient::http(&url, HashMap::new(), Duration::from_secs(5)).unwrap();

        client.initialize().await.unwrap();
        assert_eq!(
            client.transport().session_id().await.as_deref(),
            Some(crate::client::testing::SESSION_ID)
        );

        // tools/list is answered with an event-stream body
        let names: Vec<_> = client.list_tools().await.unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["add", "multiply"]);

        let result = client
            .call_tool("add", serde_json::json!({"a": 54, "b": 6}))
            .await
            .unwrap();
        assert_eq!(result.first_text(), Some("54.0 + 6.0 = 60.0"));

        client.close().await.unwrap();
        assert_eq!(client.transport().session_id().await, None);

        let log = log.lock().unwrap().clone();
        assert_eq!(
            log,
            vec![
                "POST initialize -",
                "POST notifications/initialized session-1",
                "POST tools/list session-1",
                "POST tools/call session-1",
                "DELETE - session-1",
            ]
        );
    }
}
