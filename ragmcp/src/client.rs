//! HTTP client side of the protocol
//!
//! [`HttpTransport`] performs one JSON-RPC round trip and classifies what can
//! go wrong on the way. [`McpClient`] adds id allocation and tool helpers on
//! top of it.

use crate::error::{Error, Result, TransportError};
use crate::mcp::protocol::{
    decode_http_body, normalize_response, JsonRpcRequest, JsonRpcResponse, ToolDefinition,
    ToolResult,
};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// POSTs JSON-RPC envelopes to a single endpoint
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpTransport {
    /// Create a transport with an end-to-end timeout per request
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one message and return the decoded, not yet normalized, body.
    ///
    /// A non-2xx response is still returned when its body is a JSON-RPC
    /// error envelope, so server-side error codes survive the round trip.
    pub async fn post(&self, message: &JsonRpcRequest) -> Result<Value> {
        tracing::debug!("POST {} ({})", self.url, message.method);

        let response = self
            .client
            .post(&self.url)
            .header(ACCEPT, "application/json, text/event-stream")
            .json(message)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.bytes().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            if let Ok(value) = decode_http_body(&body, content_type.as_deref()) {
                if value.get("error").is_some_and(|e| !e.is_null()) {
                    tracing::debug!("Relaying error envelope from HTTP {}", status.as_u16());
                    return Ok(value);
                }
            }
            return Err(
                TransportError::status(status.as_u16(), &String::from_utf8_lossy(&body)).into(),
            );
        }

        decode_http_body(&body, content_type.as_deref()).map_err(|e| match e {
            Error::Protocol(detail) => TransportError::InvalidBody(detail).into(),
            other => other,
        })
    }

    fn classify(&self, err: reqwest::Error) -> Error {
        let transport = if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_connect() {
            TransportError::ConnectionRefused {
                url: self.url.clone(),
            }
        } else {
            TransportError::Request(err.to_string())
        };
        transport.into()
    }
}

/// Request/response client with sequential string ids
#[derive(Debug)]
pub struct McpClient {
    transport: HttpTransport,
    next_id: AtomicU64,
}

impl McpClient {
    /// Wrap a transport
    pub fn new(transport: HttpTransport) -> Self {
        Self {
            transport,
            next_id: AtomicU64::new(1),
        }
    }

    /// Underlying transport
    pub fn transport(&self) -> &HttpTransport {
        &self.transport
    }

    fn allocate_id(&self) -> String {
        self.next_id.fetch_add(1, Ordering::Relaxed).to_string()
    }

    /// Send a request and normalize whatever comes back
    pub async fn request(&self, method: &str, params: Option<Value>) -> Result<JsonRpcResponse> {
        let id = self.allocate_id();
        let request = JsonRpcRequest::new(Some(id.clone()), method, params);
        let raw = self.transport.post(&request).await?;
        Ok(normalize_response(raw, Some(&id)))
    }

    /// Perform the `initialize` handshake and return the server's reply
    pub async fn initialize(&self) -> Result<Value> {
        let response = self
            .request(
                "initialize",
                Some(json!({
                    "protocolVersion": crate::mcp::protocol::MCP_PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {"name": "ragmcp", "version": crate::VERSION}
                })),
            )
            .await?;
        into_result(response)
    }

    /// List the server's tools
    pub async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        let result = into_result(self.request("tools/list", None).await?)?;
        let tools = result.get("tools").cloned().unwrap_or_else(|| json!([]));
        Ok(serde_json::from_value(tools)?)
    }

    /// Call a tool by name
    pub async fn call_tool(&self, name: &str, arguments: Value) -> Result<ToolResult> {
        let response = self
            .request(
                "tools/call",
                Some(json!({"name": name, "arguments": arguments})),
            )
            .await?;
        Ok(serde_json::from_value(into_result(response)?)?)
    }
}

/// Unwrap a response into its result, turning an error envelope into an error
fn into_result(response: JsonRpcResponse) -> Result<Value> {
    if let Some(error) = response.error {
        return Err(Error::Protocol(error.to_string()));
    }
    response
        .result
        .ok_or_else(|| Error::Protocol("response carried no result".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::JsonRpcError;

    #[test]
    fn test_ids_are_sequential_strings() {
        let transport =
            HttpTransport::new("http://127.0.0.1:1/sse", Duration::from_secs(1)).unwrap();
        let client = McpClient::new(transport);
        assert_eq!(client.allocate_id(), "1");
        assert_eq!(client.allocate_id(), "2");
        assert_eq!(client.transport().url(), "http://127.0.0.1:1/sse");
    }

    #[test]
    fn test_into_result() {
        let ok = JsonRpcResponse::success(Some("1".into()), json!({"x": 1}));
        assert_eq!(into_result(ok).unwrap(), json!({"x": 1}));

        let err = JsonRpcResponse::error(Some("1".into()), JsonRpcError::method_not_found("x"));
        let err = into_result(err).unwrap_err();
        assert!(err.to_string().contains("-32601"));
    }

    #[tokio::test]
    async fn test_connection_refused() {
        let transport =
            HttpTransport::new("http://127.0.0.1:1/sse", Duration::from_secs(5)).unwrap();
        let request = JsonRpcRequest::new(Some("1".into()), "tools/list", None);

        let err = transport.post(&request).await.unwrap_err();
        assert!(
            matches!(
                err,
                Error::Transport(TransportError::ConnectionRefused { .. })
            ),
            "unexpected error: {err}"
        );
        assert!(err.to_string().contains("127.0.0.1:1"));
    }
}
