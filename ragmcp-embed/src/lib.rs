//! # ragmcp Embed - Embedding Generation for ragmcp
//!
//! This crate provides the fastembed-backed (Rust-native ONNX) implementation
//! of the [`ragmcp::Embedder`] capability used by the local vector store.
//!
//! ## Models
//!
//! - `all-MiniLM-L6-v2` (default, ~80MB, 384 dimensions)
//! - `bge-small-en-v1.5` (higher quality, ~130MB, 384 dimensions)
//! - `paraphrase-multilingual-MiniLM-L12-v2` (multilingual, ~470MB, 384 dimensions)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ragmcp_embed::{EmbedConfig, FastEmbedder, Model};
//! use ragmcp::LocalVectorStore;
//! use std::sync::Arc;
//!
//! let embedder = FastEmbedder::with_config(EmbedConfig {
//!     model: Model::Multilingual,
//!     ..Default::default()
//! })?;
//! let store = LocalVectorStore::open("./vector_db", "rag_documents", Arc::new(embedder)).await?;
//! ```

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use std::sync::Arc;
use thiserror::Error;

/// Embedding error types
#[derive(Error, Debug)]
pub enum EmbedError {
    /// Model not found or failed to load
    #[error("Model error: {0}")]
    ModelError(String),

    /// Embedding generation failed
    #[error("Embedding failed: {0}")]
    EmbeddingFailed(String),
}

/// Result type for embedding operations
pub type Result<T> = std::result::Result<T, EmbedError>;

impl From<EmbedError> for ragmcp::Error {
    fn from(err: EmbedError) -> Self {
        ragmcp::Error::Embedding(err.to_string())
    }
}

/// Supported embedding models
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Model {
    /// all-MiniLM-L6-v2 - Fast and small (~80MB, 384 dimensions)
    #[default]
    AllMiniLmL6V2,
    /// BGE Small EN v1.5 - Higher quality (~130MB, 384 dimensions)
    BgeSmallEnV1_5,
    /// paraphrase-multilingual-MiniLM-L12-v2 - Korean and 50+ other languages
    Multilingual,
}

impl Model {
    /// Get the fastembed model enum
    fn to_fastembed(self) -> EmbeddingModel {
        match self {
            Model::AllMiniLmL6V2 => EmbeddingModel::AllMiniLML6V2,
            Model::BgeSmallEnV1_5 => EmbeddingModel::BGESmallENV15,
            Model::Multilingual => EmbeddingModel::ParaphraseMLMiniLML12V2,
        }
    }

    /// Get embedding dimensions for this model
    pub fn dimensions(&self) -> usize {
        match self {
            Model::AllMiniLmL6V2 | Model::BgeSmallEnV1_5 | Model::Multilingual => 384,
        }
    }

    /// Get model name
    pub fn name(&self) -> &'static str {
        match self {
            Model::AllMiniLmL6V2 => "all-MiniLM-L6-v2",
            Model::BgeSmallEnV1_5 => "bge-small-en-v1.5",
            Model::Multilingual => "paraphrase-multilingual-MiniLM-L12-v2",
        }
    }
}

impl std::str::FromStr for Model {
    type Err = EmbedError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "all-minilm-l6-v2" | "minilm" | "default" => Ok(Model::AllMiniLmL6V2),
            "bge-small-en-v1.5" | "bge-small" | "bge" => Ok(Model::BgeSmallEnV1_5),
            "paraphrase-multilingual-minilm-l12-v2" | "multilingual" => Ok(Model::Multilingual),
            _ => Err(EmbedError::ModelError(format!("Unknown model: {}", s))),
        }
    }
}

/// Embedding model configuration
#[derive(Debug, Clone)]
pub struct EmbedConfig {
    /// Model to use
    pub model: Model,
    /// Cache directory for model files
    pub cache_dir: Option<std::path::PathBuf>,
    /// Show download progress
    pub show_download_progress: bool,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            model: Model::default(),
            cache_dir: None,
            show_download_progress: true,
        }
    }
}

/// fastembed-backed embedder
pub struct FastEmbedder {
    model: Arc<TextEmbedding>,
    config: EmbedConfig,
}

impl FastEmbedder {
    /// Create a new embedder with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(EmbedConfig::default())
    }

    /// Create a new embedder with custom configuration.
    ///
    /// Downloads the model on first use; call this during startup, not per
    /// request.
    pub fn with_config(config: EmbedConfig) -> Result<Self> {
        tracing::info!("Initializing embedder with model: {}", config.model.name());

        let mut init_options = InitOptions::new(config.model.to_fastembed())
            .with_show_download_progress(config.show_download_progress);

        if let Some(ref cache_dir) = config.cache_dir {
            init_options = init_options.with_cache_dir(cache_dir.clone());
        }

        let model = TextEmbedding::try_new(init_options)
            .map_err(|e| EmbedError::ModelError(e.to_string()))?;

        tracing::info!("Embedder initialized successfully");
        Ok(Self {
            model: Arc::new(model),
            config,
        })
    }

    /// Get embedding dimensions for the current model
    pub fn dimensions(&self) -> usize {
        self.config.model.dimensions()
    }
}

fn embed_with(model: &TextEmbedding, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    model
        .embed(texts, None)
        .map_err(|e| EmbedError::EmbeddingFailed(e.to_string()))
}

#[async_trait]
impl ragmcp::Embedder for FastEmbedder {
    async fn embed(&self, texts: Vec<String>) -> ragmcp::Result<Vec<Vec<f32>>> {
        let model = Arc::clone(&self.model);
        let count = texts.len();

        let embeddings = tokio::task::spawn_blocking(move || embed_with(&model, texts))
            .await
            .map_err(|e| EmbedError::EmbeddingFailed(e.to_string()))??;

        tracing::debug!("Embedded {} texts", count);
        Ok(embeddings)
    }

    fn model_name(&self) -> &str {
        self.config.model.name()
    }
}
