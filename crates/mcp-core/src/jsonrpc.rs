//! JSON-RPC 2.0 envelope
//!
//! Messages travel as single JSON objects. Requests carry an `id` and expect a
//! response with the same `id`; notifications omit it and expect nothing back.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// JSON-RPC protocol version string
pub const JSONRPC_VERSION: &str = "2.0";

/// Invalid JSON was received
pub const PARSE_ERROR: i64 = -32700;
/// The JSON sent is not a valid request object
pub const INVALID_REQUEST: i64 = -32600;
/// The method does not exist or is not available
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Invalid method parameters
pub const INVALID_PARAMS: i64 = -32602;
/// Internal JSON-RPC error
pub const INTERNAL_ERROR: i64 = -32603;

/// Request identifier used to correlate a response with its request
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

impl From<u64> for RequestId {
    fn from(id: u64) -> Self {
        // Ids are generated from a counter starting at 1; saturate rather than wrap.
        Self::Number(i64::try_from(id).unwrap_or(i64::MAX))
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::String(id.to_string())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

/// A request or, when `id` is absent, a notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Create a request that expects a response
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id.into()),
            method: method.into(),
            params: Some(params),
        }
    }

    /// Create a notification (no response expected)
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: None,
            method: method.into(),
            params,
        }
    }

    /// Whether this message is a notification
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Error object carried by a failed response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(PARSE_ERROR, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(INVALID_REQUEST, message)
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("Method not found: {method}"))
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(INVALID_PARAMS, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, message)
    }
}

impl fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

/// A response to a request
///
/// Exactly one of `result` and `error` is set. `id` is `null` only when the
/// request id could not be determined (parse errors).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Option<RequestId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Option<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Split into the result value or the error object
    pub fn into_result(self) -> std::result::Result<Value, JsonRpcError> {
        match (self.error, self.result) {
            (Some(error), _) => Err(error),
            (None, Some(result)) => Ok(result),
            (None, None) => Err(JsonRpcError::internal_error(
                "Response carries neither result nor error",
            )),
        }
    }
}

/// Any message that can appear on the channel
#[derive(Debug, Clone, PartialEq)]
pub enum JsonRpcMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcRequest),
    Response(JsonRpcResponse),
}

impl JsonRpcMessage {
    /// Classify a decoded JSON value
    ///
    /// Anything with a string `method` is a request or notification; anything
    /// with `result` or `error` is a response.
    pub fn from_value(value: Value) -> std::result::Result<Self, JsonRpcError> {
        let Some(object) = value.as_object() else {
            return Err(JsonRpcError::invalid_request("Message must be a JSON object"));
        };

        if object.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(JsonRpcError::invalid_request(
                "Missing or unsupported jsonrpc version",
            ));
        }

        if object.get("method").is_some() {
            let request: JsonRpcRequest = serde_json::from_value(value)
                .map_err(|e| JsonRpcError::invalid_request(e.to_string()))?;
            return Ok(if request.is_notification() {
                Self::Notification(request)
            } else {
                Self::Request(request)
            });
        }

        if object.contains_key("result") || object.contains_key("error") {
            let response: JsonRpcResponse = serde_json::from_value(value)
                .map_err(|e| JsonRpcError::invalid_request(e.to_string()))?;
            return Ok(Self::Response(response));
        }

        Err(JsonRpcError::invalid_request(
            "Message is neither a request nor a response",
        ))
    }

    /// Id carried by the message, if any
    pub fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Request(request) | Self::Notification(request) => request.id.as_ref(),
            Self::Response(response) => response.id.as_ref(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_serialization() {
        let request = JsonRpcRequest::new(7u64, "tools/list", json!({}));
        let value = serde_json::to_value(&request).unwrap();

        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["id"], 7);
        assert_eq!(value["method"], "tools/list");
        assert!(value["params"].is_object());
    }

    #[test]
    fn test_notification_omits_id() {
        let notification = JsonRpcRequest::notification("notifications/initialized", None);
        let text = serde_json::to_string(&notification).unwrap();

        assert!(!text.contains("\"id\""));
        assert!(!text.contains("\"params\""));
        assert!(notification.is_notification());
    }

    #[test]
    fn test_parse_error_response_has_null_id() {
        let response = JsonRpcResponse::failure(None, JsonRpcError::parse_error("bad json"));
        let value = serde_json::to_value(&response).unwrap();

        assert!(value["id"].is_null());
        assert_eq!(value["error"]["code"], PARSE_ERROR);
        assert!(value.get("result").is_none());
    }

    #[test]
    fn test_classify_messages() {
        let request = JsonRpcMessage::from_value(json!({
            "jsonrpc": "2.0", "id": 1, "method": "ping"
        }))
        .unwrap();
        assert!(matches!(request, JsonRpcMessage::Request(_)));
        assert_eq!(request.id(), Some(&RequestId::Number(1)));

        let notification = JsonRpcMessage::from_value(json!({
            "jsonrpc": "2.0", "method": "notifications/initialized"
        }))
        .unwrap();
        assert!(matches!(notification, JsonRpcMessage::Notification(_)));

        let response = JsonRpcMessage::from_value(json!({
            "jsonrpc": "2.0", "id": "abc", "result": {}
        }))
        .unwrap();
        assert!(matches!(response, JsonRpcMessage::Response(_)));
        assert_eq!(response.id(), Some(&RequestId::from("abc")));
    }

    #[test]
    fn test_classify_rejects_garbage() {
        let err = JsonRpcMessage::from_value(json!([1, 2, 3])).unwrap_err();
        assert_eq!(err.code, INVALID_REQUEST);

        let err = JsonRpcMessage::from_value(json!({"jsonrpc": "1.0", "method": "x"})).unwrap_err();
        assert_eq!(err.code, INVALID_REQUEST);

        let err = JsonRpcMessage::from_value(json!({"jsonrpc": "2.0", "id": 1})).unwrap_err();
        assert_eq!(err.code, INVALID_REQUEST);
    }

    #[test]
    fn test_into_result() {
        let ok = JsonRpcResponse::success(RequestId::Number(1), json!({"tools": []}));
        assert_eq!(ok.into_result().unwrap(), json!({"tools": []}));

        let err = JsonRpcResponse::failure(
            Some(RequestId::Number(2)),
            JsonRpcError::method_not_found("foo"),
        );
        let error = err.into_result().unwrap_err();
        assert_eq!(error.code, METHOD_NOT_FOUND);
        assert_eq!(error.to_string(), "[-32601] Method not found: foo");
    }
}
