//! Embedding port
//!
//! Optional vector embeddings used for the similarity ranking feature.

use super::provider::ProviderError;
use async_trait::async_trait;

#[async_trait]
pub trait EmbeddingPort: Send + Sync {
    /// Embed a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError>;
}
