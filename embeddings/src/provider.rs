use crate::error::EmbeddingError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Static description of the model behind a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingModelInfo {
    pub provider: String,
    pub model: String,
    /// Vector length, when known up front
    pub dimensions: Option<usize>,
    /// Largest number of texts accepted in one call
    pub max_batch_size: Option<usize>,
}

/// A remote or local embedding backend.
///
/// Implementations return exactly one vector per input text, in input order.
/// Retry and cancellation are handled by [`crate::RetryingEmbedder`].
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    fn model_info(&self) -> EmbeddingModelInfo;
}
