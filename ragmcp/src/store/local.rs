//! Local vector store
//!
//! Keeps every chunk and its embedding in memory and answers queries by
//! brute-force cosine similarity. When a persist directory is configured the
//! collection is written to `<dir>/<collection>.json` after every change.

use super::{
    cosine_similarity, Document, Embedder, Metadata, ScoredDocument, StoreInfo, VectorStore,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A stored chunk with its embedding
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredEntry {
    content: String,
    metadata: Metadata,
    embedding: Vec<f32>,
}

/// On-disk collection layout
#[derive(Debug, Serialize, Deserialize)]
struct CollectionFile {
    name: String,
    embedding_model: String,
    entries: Vec<StoredEntry>,
}

/// In-memory cosine-similarity index with optional JSON persistence
pub struct LocalVectorStore {
    collection_name: String,
    persist_directory: Option<PathBuf>,
    embedder: Arc<dyn Embedder>,
    entries: RwLock<Vec<StoredEntry>>,
}

impl LocalVectorStore {
    /// Open or create a persisted collection
    pub async fn open(
        persist_directory: impl Into<PathBuf>,
        collection_name: impl Into<String>,
        embedder: Arc<dyn Embedder>,
    ) -> Result<Self> {
        let persist_directory = persist_directory.into();
        let collection_name = collection_name.into();
        let path = collection_file(&persist_directory, &collection_name);

        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let file: CollectionFile = serde_json::from_slice(&bytes)?;
                if file.embedding_model != embedder.model_name() {
                    tracing::warn!(
                        "Collection {} was embedded with {} but the configured model is {}",
                        collection_name,
                        file.embedding_model,
                        embedder.model_name()
                    );
                }
                tracing::info!(
                    "Loaded {} entries from {}",
                    file.entries.len(),
                    path.display()
                );
                file.entries
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };

        let store = Self {
            collection_name,
            persist_directory: Some(persist_directory),
            embedder,
            entries: RwLock::new(entries),
        };
        store.ensure_collection().await?;
        Ok(store)
    }

    /// Create a collection that lives only in memory (for testing)
    pub fn open_memory(collection_name: impl Into<String>, embedder: Arc<dyn Embedder>) -> Self {
        Self {
            collection_name: collection_name.into(),
            persist_directory: None,
            embedder,
            entries: RwLock::new(Vec::new()),
        }
    }

    fn collection_path(&self) -> Option<PathBuf> {
        self.persist_directory
            .as_ref()
            .map(|dir| collection_file(dir, &self.collection_name))
    }

    /// Write the collection file via a temporary file and rename
    async fn persist(&self, entries: &[StoredEntry]) -> Result<()> {
        let Some(path) = self.collection_path() else {
            return Ok(());
        };

        let file = CollectionFile {
            name: self.collection_name.clone(),
            embedding_model: self.embedder.model_name().to_string(),
            entries: entries.to_vec(),
        };
        let bytes = serde_json::to_vec(&file)?;

        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;

        tracing::debug!("Persisted {} entries to {}", entries.len(), path.display());
        Ok(())
    }
}

fn collection_file(dir: &std::path::Path, collection_name: &str) -> PathBuf {
    dir.join(format!("{}.json", collection_name))
}

#[async_trait]
impl VectorStore for LocalVectorStore {
    async fn add(&self, documents: Vec<Document>) -> Result<()> {
        if documents.is_empty() {
            return Ok(());
        }

        let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
        let embeddings = self.embedder.embed(texts).await?;
        if embeddings.len() != documents.len() {
            return Err(Error::Embedding(format!(
                "expected {} embeddings, got {}",
                documents.len(),
                embeddings.len()
            )));
        }

        let mut entries = self.entries.write().await;
        let previous_len = entries.len();
        entries.extend(
            documents
                .into_iter()
                .zip(embeddings)
                .map(|(doc, embedding)| StoredEntry {
                    content: doc.content,
                    metadata: doc.metadata,
                    embedding,
                }),
        );

        // Memory must not hold entries the collection file lacks
        if let Err(e) = self.persist(&entries).await {
            entries.truncate(previous_len);
            tracing::error!("Failed to persist collection {}: {}", self.collection_name, e);
            return Err(e);
        }

        Ok(())
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredDocument>> {
        if k == 0 || self.entries.read().await.is_empty() {
            return Ok(Vec::new());
        }

        let query_embedding = self
            .embedder
            .embed(vec![query.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embedding("no embedding returned for query".to_string()))?;

        let entries = self.entries.read().await;
        let mut scored: Vec<(f32, &StoredEntry)> = entries
            .iter()
            .map(|entry| (cosine_similarity(&query_embedding, &entry.embedding), entry))
            .collect();

        // Stable sort keeps insertion order for equal scores
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(score, entry)| ScoredDocument {
                content: entry.content.clone(),
                metadata: entry.metadata.clone(),
                score,
            })
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }

    async fn delete_collection(&self) -> Result<()> {
        let mut entries = self.entries.write().await;

        if let Some(path) = self.collection_path() {
            match tokio::fs::remove_file(&path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        entries.clear();

        tracing::info!("Deleted collection {}", self.collection_name);
        Ok(())
    }

    async fn ensure_collection(&self) -> Result<()> {
        let (Some(dir), Some(path)) = (self.persist_directory.as_ref(), self.collection_path())
        else {
            return Ok(());
        };

        tokio::fs::create_dir_all(dir).await?;
        if !tokio::fs::try_exists(&path).await? {
            let entries = self.entries.read().await;
            self.persist(&entries).await?;
        }

        Ok(())
    }

    fn info(&self) -> StoreInfo {
        StoreInfo {
            collection_name: self.collection_name.clone(),
            persist_directory: self.persist_directory.clone(),
            embedding_model: self.embedder.model_name().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::HashingEmbedder;
    use serde_json::json;
    use tempfile::tempdir;

    fn embedder() -> Arc<dyn Embedder> {
        Arc::new(HashingEmbedder::new())
    }

    fn docs() -> Vec<Document> {
        let mut rust = Metadata::new();
        rust.insert("source".to_string(), json!("rust.md"));
        vec![
            Document::with_metadata("Rust ownership and borrowing rules", rust),
            Document::new("Python uses dynamic typing"),
            Document::new("Web servers speak HTTP"),
        ]
    }

    #[tokio::test]
    async fn test_add_and_count() {
        let store = LocalVectorStore::open_memory("test", embedder());
        assert_eq!(store.count().await.unwrap(), 0);
        store.add(docs()).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let store = LocalVectorStore::open_memory("test", embedder());
        store.add(docs()).await.unwrap();

        let results = store.search("rust ownership", 2).await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(results[0].content.contains("Rust"));
        assert_eq!(results[0].metadata["source"], "rust.md");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_search_empty_store() {
        let store = LocalVectorStore::open_memory("test", embedder());
        assert!(store.search("anything", 4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_persistence_roundtrip() {
        let dir = tempdir().unwrap();

        {
            let store = LocalVectorStore::open(dir.path(), "docs", embedder()).await.unwrap();
            store.add(docs()).await.unwrap();
        }

        let reopened = LocalVectorStore::open(dir.path(), "docs", embedder()).await.unwrap();
        assert_eq!(reopened.count().await.unwrap(), 3);
        assert!(dir.path().join("docs.json").exists());
    }

    #[tokio::test]
    async fn test_failed_save_keeps_memory_in_sync() {
        let dir = tempdir().unwrap();
        let db = dir.path().join("db");
        let store = LocalVectorStore::open(&db, "docs", embedder()).await.unwrap();
        store.add(docs()).await.unwrap();

        std::fs::remove_dir_all(&db).unwrap();

        let err = store.add(vec![Document::new("never saved")]).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(store.count().await.unwrap(), 3);

        let results = store.search("never saved", 4).await.unwrap();
        assert!(results.iter().all(|d| d.content != "never saved"));
    }

    #[tokio::test]
    async fn test_delete_and_recreate() {
        let dir = tempdir().unwrap();
        let store = LocalVectorStore::open(dir.path(), "docs", embedder()).await.unwrap();
        store.add(docs()).await.unwrap();

        store.delete_collection().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(!dir.path().join("docs.json").exists());

        store.ensure_collection().await.unwrap();
        assert!(dir.path().join("docs.json").exists());
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_info() {
        let dir = tempdir().unwrap();
        let store = LocalVectorStore::open(dir.path(), "docs", embedder()).await.unwrap();
        let info = store.info();
        assert_eq!(info.collection_name, "docs");
        assert_eq!(info.persist_directory.as_deref(), Some(dir.path()));
        assert_eq!(info.embedding_model, "hashing");
    }
}
