use thiserror::Error;

/// Errors that can occur during vector store operations
#[derive(Debug, Error)]
pub enum VectorStoreError {
    /// Invalid query provided
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Embedding length differs from what the project already holds
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
