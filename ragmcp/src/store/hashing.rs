//! Feature-hashing embedder
//!
//! Maps lower-cased alphanumeric tokens into a fixed number of buckets using
//! SHA-256 and L2-normalises the counts. Needs no model download, so it backs
//! offline deployments and tests.

use super::Embedder;
use crate::error::Result;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Default number of dimensions
pub const DEFAULT_DIMENSIONS: usize = 256;

/// Bag-of-words embedder using the hashing trick
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    /// Create an embedder with the default dimensions
    pub fn new() -> Self {
        Self::with_dimensions(DEFAULT_DIMENSIONS)
    }

    /// Create an embedder with a custom number of dimensions (at least 1)
    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Embedding dimensions
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed a single text synchronously
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&digest[..8]);
            let index = (u64::from_le_bytes(bucket) % self.dimensions as u64) as usize;
            // Sign bit reduces the bias of colliding tokens
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }

        vector
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.embed_text(text)).collect())
    }

    fn model_name(&self) -> &str {
        "hashing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::cosine_similarity;

    #[test]
    fn test_embedding_is_normalised() {
        let embedder = HashingEmbedder::new();
        let v = embedder.embed_text("Rust is a systems programming language");
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert_eq!(v.len(), DEFAULT_DIMENSIONS);
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::with_dimensions(16);
        assert!(embedder.embed_text("  ,.; ").iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_case_insensitive() {
        let embedder = HashingEmbedder::new();
        assert_eq!(embedder.embed_text("Rust"), embedder.embed_text("rust"));
    }

    #[test]
    fn test_shared_tokens_score_higher() {
        let embedder = HashingEmbedder::new();
        let query = embedder.embed_text("rust ownership");
        let related = embedder.embed_text("ownership rules in rust");
        let unrelated = embedder.embed_text("python dynamic typing");
        assert!(cosine_similarity(&query, &related) > cosine_similarity(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_embed_batch() {
        let embedder = HashingEmbedder::new();
        let vectors = embedder
            .embed(vec!["one".to_string(), "two".to_string()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(embedder.model_name(), "hashing");
    }
}
