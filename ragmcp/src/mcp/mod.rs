//! MCP (Model Context Protocol) server for ragmcp
//!
//! JSON-RPC over HTTP: one request per `POST /sse`, answered either as plain
//! JSON or, by other servers, as an event stream. The codec in [`protocol`]
//! accepts both.
//!
//! ## Tools Exposed
//!
//! - `add_documents` - Chunk, embed and store texts
//! - `search_documents` - Similarity search over stored chunks
//! - `rag_query` - Answer a question from retrieved chunks
//! - `get_collection_info` - Collection statistics
//! - `delete_collection` - Drop and recreate the collection
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ragmcp::mcp::{http, McpServer};
//! use ragmcp::AppContext;
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = McpServer::new(AppContext::new(store));
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await.unwrap();
//!     http::serve(listener, server, std::future::pending()).await.unwrap();
//! }
//! ```

pub mod http;
pub mod protocol;
mod server;
pub mod tools;

pub use protocol::{
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, Method, ToolDefinition, ToolResult,
};
pub use server::McpServer;
