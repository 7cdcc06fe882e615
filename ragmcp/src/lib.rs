//! # ragmcp - retrieval-augmented search over MCP
//!
//! A document store exposed to AI agents as Model Context Protocol tools.
//!
//! ragmcp provides:
//! - **Chunking** of ingested text by recursive separator priority
//! - **Vector search** through the [`VectorStore`] capability
//! - **Answer generation** from retrieved chunks through [`Completion`]
//! - **MCP server** speaking JSON-RPC over HTTP
//! - **stdio bridge** relaying a line-delimited JSON-RPC stream to that server
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ragmcp::{AppContext, HashingEmbedder, LocalVectorStore, McpServer};
//! use std::sync::Arc;
//!
//! let embedder = Arc::new(HashingEmbedder::new());
//! let store = LocalVectorStore::open("./vector_db", "rag_documents", embedder).await?;
//! let server = McpServer::new(AppContext::new(Arc::new(store)));
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8000").await?;
//! ragmcp::mcp::http::serve(listener, server, std::future::pending()).await?;
//! ```

pub mod bridge;
pub mod chunker;
pub mod client;
pub mod completion;
pub mod config;
pub mod context;
pub mod error;
pub mod mcp;
pub mod store;

// Re-exports for convenience
pub use bridge::Bridge;
pub use chunker::Chunker;
pub use client::{HttpTransport, McpClient};
pub use completion::{AnthropicCompletion, Completion};
pub use context::AppContext;
pub use error::{Error, Result, TransportError};
pub use mcp::McpServer;
pub use store::{
    Document, Embedder, HashingEmbedder, LocalVectorStore, Metadata, ScoredDocument, StoreInfo,
    VectorStore,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
