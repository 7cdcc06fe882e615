//! HTTP transport for the MCP server
//!
//! `POST /sse` carries one JSON-RPC request per call. The remaining routes
//! are informational.

use super::protocol::{
    JsonRpcError, JsonRpcResponse, ServerInfo, FALLBACK_ID, METHOD_NOT_FOUND, PARSE_ERROR,
};
use super::server::McpServer;
use super::tools::get_tool_definitions;
use crate::config::RPC_PATH;
use crate::error::Result;
use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::future::Future;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the application router
pub fn router(server: McpServer) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/tools", get(list_tools))
        .route(RPC_PATH, post(rpc))
        // add_documents sends whole files in one request
        .layer(DefaultBodyLimit::disable())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, server: McpServer, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!("MCP endpoint available at http://{}{}", addr, RPC_PATH);

    axum::serve(listener, router(server))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// HTTP status for a JSON-RPC response
pub fn status_for(response: &JsonRpcResponse) -> StatusCode {
    match response.error.as_ref().map(|e| e.code) {
        None => StatusCode::OK,
        Some(PARSE_ERROR) | Some(METHOD_NOT_FOUND) => StatusCode::BAD_REQUEST,
        Some(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn rpc(
    State(server): State<McpServer>,
    body: std::result::Result<Bytes, BytesRejection>,
) -> impl IntoResponse {
    let response = match body {
        Ok(body) => server.handle_body(&body).await,
        Err(rejection) => {
            tracing::warn!("Failed to read request body: {}", rejection.body_text());
            JsonRpcResponse::error(
                Some(FALLBACK_ID.to_string()),
                JsonRpcError::internal_error(rejection.body_text()),
            )
        }
    };
    (status_for(&response), Json(response))
}

async fn root() -> Json<Value> {
    let info = ServerInfo::default();
    Json(json!({
        "name": info.name,
        "version": info.version,
        "endpoints": {
            "sse": RPC_PATH,
            "health": "/health",
            "tools": "/tools"
        }
    }))
}

async fn health(State(server): State<McpServer>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "vectorstore": true,
        "completion": server.context().has_completion()
    }))
}

async fn list_tools() -> Json<Value> {
    Json(json!({ "tools": get_tool_definitions() }))
}
