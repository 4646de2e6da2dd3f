use thiserror::Error;

/// Substrings that mark a provider failure as transient.
const RETRYABLE_MARKERS: &[&str] = &[
    "rate limit",
    "429",
    "502",
    "503",
    "timeout",
    "connection",
    "temporary",
];

/// Errors that can occur during embedding operations
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Invalid input provided to the embedding provider
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The provider answered with a non-success HTTP status
    #[error("Embedding API error (status {status}): {message}")]
    Api { status: u16, message: String },

    /// Transport-level failure talking to the provider
    #[error("Embedding request failed: {0}")]
    Request(String),

    /// The provider response could not be used
    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),

    /// Failure reported by a provider implementation
    #[error("Embedding provider error: {0}")]
    Provider(String),

    /// The caller cancelled the operation
    #[error("Embedding cancelled")]
    Cancelled,

    /// Every attempt failed with a transient error
    #[error("failed after {attempts} retries: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<EmbeddingError>,
    },
}

impl EmbeddingError {
    /// Whether retrying the same request may succeed.
    ///
    /// Structural failures never are; everything else is judged by the
    /// lower-cased error message.
    pub fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::InvalidInput(_)
            | EmbeddingError::InvalidResponse(_)
            | EmbeddingError::Cancelled
            | EmbeddingError::RetriesExhausted { .. } => false,
            _ => is_retryable_message(&self.to_string()),
        }
    }
}

/// Classify a raw error message as transient.
pub fn is_retryable_message(message: &str) -> bool {
    let message = message.to_lowercase();
    RETRYABLE_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}
