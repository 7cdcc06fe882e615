//! Shared handles passed into every tool invocation

use crate::completion::Completion;
use crate::store::VectorStore;
use std::sync::Arc;

/// Capabilities available to tool handlers.
///
/// Built once during startup, before the listener accepts traffic, and
/// cloned cheaply into each request.
#[derive(Clone)]
pub struct AppContext {
    /// Vector index shared by all requests
    pub store: Arc<dyn VectorStore>,
    /// Answer generator; `None` when no API key is configured
    pub completion: Option<Arc<dyn Completion>>,
}

impl AppContext {
    /// Create a context without a completion binding
    pub fn new(store: Arc<dyn VectorStore>) -> Self {
        Self {
            store,
            completion: None,
        }
    }

    /// Attach a completion binding
    pub fn with_completion(mut self, completion: Arc<dyn Completion>) -> Self {
        self.completion = Some(completion);
        self
    }

    /// Whether `rag_query` can produce answers
    pub fn has_completion(&self) -> bool {
        self.completion.is_some()
    }
}
