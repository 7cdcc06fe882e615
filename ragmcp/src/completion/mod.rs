//! Language-model completion capability

mod anthropic;

use crate::error::Result;
use async_trait::async_trait;

pub use anthropic::{AnthropicCompletion, DEFAULT_ANTHROPIC_MODEL, DEFAULT_MAX_TOKENS};

/// Produces a natural-language answer for a prompt
#[async_trait]
pub trait Completion: Send + Sync {
    /// Complete a single-turn prompt.
    ///
    /// Fails with [`crate::Error::Upstream`] when the model call fails.
    async fn complete(&self, prompt: &str) -> Result<String>;
}
