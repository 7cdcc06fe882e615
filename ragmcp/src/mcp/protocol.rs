//! JSON-RPC 2.0 protocol types and wire codec for MCP
//!
//! Request and response ids are canonicalized to strings on decode: callers
//! may send numeric ids, but everything downstream compares and emits strings.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// JSON-RPC version marker
pub const JSONRPC_VERSION: &str = "2.0";

/// Id used when no request id could be recovered
pub const FALLBACK_ID: &str = "0";

/// Parse error code
pub const PARSE_ERROR: i32 = -32700;
/// Method not found code
pub const METHOD_NOT_FOUND: i32 = -32601;
/// Internal error code
pub const INTERNAL_ERROR: i32 = -32603;

fn default_version() -> String {
    JSONRPC_VERSION.to_string()
}

/// Canonical string form of a JSON-RPC id. `null` means no id.
pub fn canonical_id(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(canonical_id))
}

/// JSON-RPC 2.0 request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (should be "2.0")
    #[serde(default = "default_version")]
    pub jsonrpc: String,
    /// Request ID, canonicalized to a string (absent for notifications)
    #[serde(
        default,
        deserialize_with = "deserialize_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    /// Method name
    #[serde(default)]
    pub method: String,
    /// Optional parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Create a request
    pub fn new(id: Option<String>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            method: method.into(),
            params,
        }
    }

    /// Notifications expect no response
    pub fn is_notification(&self) -> bool {
        self.method.starts_with("notifications/")
    }
}

/// Decode one line of input into a request
pub fn decode_request(line: &str) -> Result<JsonRpcRequest> {
    let value: Value = serde_json::from_str(line).map_err(|e| Error::Parse(e.to_string()))?;
    request_from_value(value)
}

/// Interpret an already decoded JSON value as a request. Only objects qualify.
pub fn request_from_value(value: Value) -> Result<JsonRpcRequest> {
    if !value.is_object() {
        return Err(Error::Parse("expected a JSON object".to_string()));
    }
    serde_json::from_value(value).map_err(|e| Error::Parse(e.to_string()))
}

/// JSON-RPC 2.0 response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version
    pub jsonrpc: String,
    /// Request ID (matches the request)
    #[serde(
        default,
        deserialize_with = "deserialize_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    /// Result (present on success)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error (present on failure)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Create a successful response
    pub fn success(id: Option<String>, result: Value) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<String>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: default_version(),
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Bare envelope acknowledging a notification
    pub fn ack() -> Self {
        Self {
            jsonrpc: default_version(),
            id: None,
            result: None,
            error: None,
        }
    }

    /// Whether this is a notification acknowledgement
    pub fn is_ack(&self) -> bool {
        self.id.is_none() && self.result.is_none() && self.error.is_none()
    }
}

/// Turn an arbitrary decoded body into a protocol-valid response.
///
/// Fills in a missing `jsonrpc` marker and id (from `fallback_id`, else
/// `"0"`), and rewrites a body carrying neither `result` nor `error` into an
/// internal error whose message embeds the body. When both are present the
/// error wins.
pub fn normalize_response(raw: Value, fallback_id: Option<&str>) -> JsonRpcResponse {
    let fallback = fallback_id.unwrap_or(FALLBACK_ID).to_string();

    let mut body = match raw {
        Value::Object(body) => body,
        other => {
            return JsonRpcResponse::error(
                Some(fallback),
                JsonRpcError::internal_error(format!("Invalid response format: {}", other)),
            );
        }
    };

    let jsonrpc = body
        .get("jsonrpc")
        .and_then(Value::as_str)
        .unwrap_or(JSONRPC_VERSION)
        .to_string();
    let id = body
        .get("id")
        .and_then(canonical_id)
        .unwrap_or(fallback);

    let has_error = body.get("error").is_some_and(|e| !e.is_null());
    let has_result = body.contains_key("result");

    if has_error {
        let error = body.remove("error").unwrap_or(Value::Null);
        let error = serde_json::from_value::<JsonRpcError>(error.clone()).unwrap_or_else(|_| {
            JsonRpcError::internal_error(format!("Invalid error object: {}", error))
        });
        return JsonRpcResponse {
            jsonrpc,
            id: Some(id),
            result: None,
            error: Some(error),
        };
    }

    if has_result {
        return JsonRpcResponse {
            jsonrpc,
            id: Some(id),
            result: body.remove("result"),
            error: None,
        };
    }

    JsonRpcResponse {
        jsonrpc,
        id: Some(id),
        result: None,
        error: Some(JsonRpcError::internal_error(format!(
            "Invalid response format: {}",
            Value::Object(body)
        ))),
    }
}

/// Payload of an event-stream `data:` line
pub fn sse_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim)
}

/// Extract the JSON payload of an HTTP response body.
///
/// Tries a plain JSON decode first, then scans the body as an event stream
/// and decodes the first `data:` line. The content type is only reported in
/// the error; upstreams do not declare it reliably.
pub fn decode_http_body(body: &[u8], content_type: Option<&str>) -> Result<Value> {
    let json_err = match serde_json::from_slice::<Value>(body) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let text = String::from_utf8_lossy(body);
    if let Some(payload) = text.lines().find_map(sse_data_payload) {
        tracing::debug!("Decoding event-stream payload");
        return serde_json::from_str(payload)
            .map_err(|e| Error::Protocol(format!("event-stream payload is not JSON: {}", e)));
    }

    Err(Error::Protocol(format!(
        "body ({}) is neither JSON nor an event stream: {}",
        content_type.unwrap_or("no content type"),
        json_err
    )))
}

/// JSON-RPC 2.0 error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code
    pub code: i32,
    /// Error message
    pub message: String,
    /// Optional additional data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Create a new error
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create a parse error (-32700)
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(PARSE_ERROR, message)
    }

    /// Create a method not found error (-32601)
    pub fn method_not_found(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("Method not found: {}", method))
    }

    /// Create an internal error (-32603)
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(INTERNAL_ERROR, message)
    }
}

impl std::fmt::Display for JsonRpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for JsonRpcError {}

/// Methods understood by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// `initialize` handshake
    Initialize,
    /// `notifications/initialized`
    Initialized,
    /// Any other `notifications/*` message
    Notification(String),
    /// `tools/list`
    ToolsList,
    /// `tools/call`
    ToolsCall,
    /// Anything else
    Unknown(String),
}

impl Method {
    /// Classify a method name
    pub fn parse(name: &str) -> Self {
        match name {
            "initialize" => Method::Initialize,
            "notifications/initialized" => Method::Initialized,
            "tools/list" => Method::ToolsList,
            "tools/call" => Method::ToolsCall,
            other if other.starts_with("notifications/") => {
                Method::Notification(other.to_string())
            }
            other => Method::Unknown(other.to_string()),
        }
    }
}

/// MCP protocol version
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Server capabilities for MCP
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Tools capability
    pub tools: ToolsCapability,
}

impl Default for ServerCapabilities {
    fn default() -> Self {
        Self {
            tools: ToolsCapability {},
        }
    }
}

/// Tools capability (empty object indicates tools are supported)
#[derive(Debug, Clone, Serialize, Default)]
pub struct ToolsCapability {}

/// Server info for MCP
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name
    pub name: String,
    /// Server version
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: "rag-search-server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Tool definition for MCP
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,
    /// Tool description
    pub description: String,
    /// Input schema (JSON Schema)
    pub input_schema: Value,
}

/// Tool call result content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolContent {
    /// Content type (usually "text")
    #[serde(rename = "type")]
    pub content_type: String,
    /// Content text
    pub text: String,
}

impl ToolContent {
    /// Create a text content
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content_type: "text".to_string(),
            text: text.into(),
        }
    }
}

/// Tool call result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// Content array
    pub content: Vec<ToolContent>,
}

impl ToolResult {
    /// Create a result with a single text content
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::text(text)],
        }
    }

    /// Concatenated text of all content blocks
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .map(|c| c.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}
