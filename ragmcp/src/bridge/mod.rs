//! stdio to HTTP bridge
//!
//! Reads one JSON-RPC request per input line, forwards it to the HTTP
//! endpoint and writes exactly one normalized response line per request.
//! Requests are handled strictly in order, one at a time.

use crate::client::HttpTransport;
use crate::error::Result;
use crate::mcp::protocol::{
    decode_request, normalize_response, JsonRpcError, JsonRpcResponse, FALLBACK_ID,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Line-oriented protocol bridge
#[derive(Debug, Clone)]
pub struct Bridge {
    transport: HttpTransport,
}

impl Bridge {
    /// Create a bridge forwarding to `transport`
    pub fn new(transport: HttpTransport) -> Self {
        Self { transport }
    }

    /// Run until `reader` reaches end of input.
    ///
    /// Per-message failures are answered on `writer`; only I/O failures on
    /// the streams themselves end the loop early.
    pub async fn run<R, W>(&self, mut reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!("Bridge forwarding to {}", self.transport.url());

        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }

            let line = String::from_utf8_lossy(&buf);
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            tracing::debug!("Received: {}", line);

            if let Some(response) = self.handle_line(line).await {
                let response_json = serde_json::to_string(&response)?;
                writer.write_all(response_json.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
                tracing::debug!("Sent: {}", response_json);
            }
        }

        tracing::info!("EOF received, shutting down");
        Ok(())
    }

    /// Handle one non-blank input line. Notifications produce no response.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        let request = match decode_request(line) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Dropping malformed line: {}", e);
                return Some(JsonRpcResponse::error(
                    Some(FALLBACK_ID.to_string()),
                    JsonRpcError::parse_error(e.to_string()),
                ));
            }
        };

        if request.is_notification() {
            if let Err(e) = self.transport.post(&request).await {
                tracing::warn!("Failed to forward {}: {}", request.method, e);
            }
            return None;
        }

        let id = request
            .id
            .clone()
            .unwrap_or_else(|| FALLBACK_ID.to_string());

        match self.transport.post(&request).await {
            Ok(raw) => Some(normalize_response(raw, Some(&id))),
            Err(e) => {
                tracing::warn!("Request {} failed: {}", id, e);
                Some(JsonRpcResponse::error(
                    Some(id),
                    JsonRpcError::internal_error(e.to_string()),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::{INTERNAL_ERROR, PARSE_ERROR};
    use serde_json::Value;
    use std::time::Duration;

    fn unreachable_bridge() -> Bridge {
        let transport =
            HttpTransport::new("http://127.0.0.1:1/sse", Duration::from_secs(5)).unwrap();
        Bridge::new(transport)
    }

    async fn run_lines(bridge: &Bridge, input: &str) -> Vec<Value> {
        let mut output = Vec::new();
        bridge.run(input.as_bytes(), &mut output).await.unwrap();
        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_malformed_line_is_parse_error() {
        let bridge = unreachable_bridge();
        let responses = run_lines(&bridge, "{not json\n").await;

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], "0");
        assert_eq!(responses[0]["error"]["code"], PARSE_ERROR);
        assert!(responses[0].get("result").is_none());
    }

    #[tokio::test]
    async fn test_blank_lines_are_skipped() {
        let bridge = unreachable_bridge();
        let responses = run_lines(&bridge, "\n   \n\r\n").await;
        assert!(responses.is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_is_internal_error() {
        let bridge = unreachable_bridge();
        let responses =
            run_lines(&bridge, "{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"tools/list\"}\n").await;

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], "7");
        assert_eq!(responses[0]["error"]["code"], INTERNAL_ERROR);
        assert!(responses[0]["error"]["message"]
            .as_str()
            .unwrap()
            .starts_with("Connection refused"));
    }

    #[tokio::test]
    async fn test_loop_continues_after_failures() {
        let bridge = unreachable_bridge();
        let input = concat!(
            "garbage\n",
            "{\"jsonrpc\":\"2.0\",\"method\":\"notifications/initialized\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":\"a\",\"method\":\"initialize\"}\n",
            "{\"jsonrpc\":\"2.0\",\"id\":2,\"method\":\"tools/list\"}",
        );
        let responses = run_lines(&bridge, input).await;

        // The notification produces no line
        assert_eq!(responses.len(), 3);
        assert_eq!(responses[0]["error"]["code"], PARSE_ERROR);
        assert_eq!(responses[1]["id"], "a");
        assert_eq!(responses[2]["id"], "2");
    }
}
