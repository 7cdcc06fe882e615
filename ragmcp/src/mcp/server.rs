//! MCP server implementation
//!
//! Stateless JSON-RPC dispatch: every request is answered on its own, using
//! the capabilities in the shared [`AppContext`].

use super::protocol::{
    canonical_id, request_from_value, JsonRpcError, JsonRpcRequest, JsonRpcResponse, Method,
    ServerCapabilities, ServerInfo, FALLBACK_ID, MCP_PROTOCOL_VERSION,
};
use super::tools::{get_tool_definitions, handle_tool_call};
use crate::context::AppContext;
use serde_json::{json, Value};
use std::sync::Arc;

/// MCP server for ragmcp
///
/// Cheap to clone; clones share the same context.
#[derive(Clone)]
pub struct McpServer {
    ctx: Arc<AppContext>,
}

impl McpServer {
    /// Create a server over a fully built context
    pub fn new(ctx: AppContext) -> Self {
        Self { ctx: Arc::new(ctx) }
    }

    /// Shared capabilities
    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// Handle a raw HTTP request body.
    ///
    /// Always yields an envelope. The request runs on its own task, so a
    /// dropped connection does not abort a tool mid-flight and a panic turns
    /// into an internal error.
    pub async fn handle_body(&self, body: &[u8]) -> JsonRpcResponse {
        let raw: Value = match serde_json::from_slice(body) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Unparsable request body: {}", e);
                return JsonRpcResponse::error(
                    Some(FALLBACK_ID.to_string()),
                    JsonRpcError::parse_error(format!("Parse error: {}", e)),
                );
            }
        };

        let recovered_id = raw
            .get("id")
            .and_then(canonical_id)
            .unwrap_or_else(|| FALLBACK_ID.to_string());

        let request = match request_from_value(raw) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("Invalid request envelope: {}", e);
                return JsonRpcResponse::error(
                    Some(recovered_id),
                    JsonRpcError::internal_error(format!("Internal error: {}", e)),
                );
            }
        };

        tracing::debug!("Received {} (id {:?})", request.method, request.id);

        let server = self.clone();
        match tokio::spawn(async move { server.handle_request(request).await }).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Request handler failed: {}", e);
                JsonRpcResponse::error(
                    Some(recovered_id),
                    JsonRpcError::internal_error(format!("Internal error: {}", e)),
                )
            }
        }
    }

    /// Handle a single JSON-RPC request
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let result = match Method::parse(&request.method) {
            Method::Initialize => Ok(self.handle_initialize()),
            Method::Initialized | Method::Notification(_) => {
                return JsonRpcResponse::ack();
            }
            Method::ToolsList => Ok(self.handle_tools_list()),
            Method::ToolsCall => self.handle_tools_call(request.params.as_ref()).await,
            Method::Unknown(method) => {
                tracing::debug!("Method not found: {}", method);
                Err(JsonRpcError::method_not_found(&method))
            }
        };

        match result {
            Ok(value) => JsonRpcResponse::success(request.id, value),
            Err(error) => JsonRpcResponse::error(request.id, error),
        }
    }

    /// Handle initialize request
    fn handle_initialize(&self) -> Value {
        json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": ServerCapabilities::default(),
            "serverInfo": ServerInfo::default()
        })
    }

    /// Handle tools/list request
    fn handle_tools_list(&self) -> Value {
        json!({ "tools": get_tool_definitions() })
    }

    /// Handle tools/call request
    async fn handle_tools_call(
        &self,
        params: Option<&Value>,
    ) -> std::result::Result<Value, JsonRpcError> {
        let tool_name = params.and_then(|p| p.get("name")).and_then(Value::as_str);
        let arguments = params
            .and_then(|p| p.get("arguments"))
            .filter(|a| !a.is_null())
            .cloned()
            .unwrap_or_else(|| json!({}));

        let result = handle_tool_call(&self.ctx, tool_name, &arguments).await;

        serde_json::to_value(result)
            .map_err(|e| JsonRpcError::internal_error(format!("Internal error: {}", e)))
    }
}
