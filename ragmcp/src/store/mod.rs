//! Vector store capability
//!
//! Handlers reach the embedding model and vector index only through the
//! [`VectorStore`] trait. [`LocalVectorStore`] is the bundled binding: a
//! cosine-similarity index over chunks embedded by any [`Embedder`].

mod hashing;
mod local;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

pub use hashing::HashingEmbedder;
pub use local::LocalVectorStore;

/// Caller-supplied document metadata, opaque to the core
pub type Metadata = serde_json::Map<String, Value>;

/// A unit of text handed to the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Create a document without metadata
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    /// Create a document with metadata
    pub fn with_metadata(content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            content: content.into(),
            metadata,
        }
    }
}

/// One entry of a ranked retrieval result
#[derive(Debug, Clone, Serialize)]
pub struct ScoredDocument {
    pub content: String,
    pub metadata: Metadata,
    /// Cosine similarity to the query (higher is closer)
    pub score: f32,
}

/// Descriptive information about the backing collection
#[derive(Debug, Clone, Serialize)]
pub struct StoreInfo {
    pub collection_name: String,
    /// `None` for in-memory stores
    pub persist_directory: Option<PathBuf>,
    pub embedding_model: String,
}

/// Embedding model capability
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, one vector per input
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>>;

    /// Model identifier reported by `get_collection_info`
    fn model_name(&self) -> &str;
}

/// Vector index capability
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Embed and store a batch of documents
    async fn add(&self, documents: Vec<Document>) -> Result<()>;

    /// Return up to `k` documents ranked by similarity to `query`
    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredDocument>>;

    /// Number of stored documents
    async fn count(&self) -> Result<usize>;

    /// Drop the collection and everything in it
    async fn delete_collection(&self) -> Result<()>;

    /// Create the collection if it does not exist
    async fn ensure_collection(&self) -> Result<()>;

    /// Collection name, location and embedding model
    fn info(&self) -> StoreInfo;
}

/// Calculate cosine similarity between two embeddings
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}
