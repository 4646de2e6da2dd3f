use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetrievalError {
    #[error("Indexer error: {0}")]
    Indexer(#[from] coderag_codebase_indexer::IndexerError),

    #[error("Vector store error: {0}")]
    VectorStore(#[from] coderag_vector_store::VectorStoreError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] coderag_embeddings::EmbeddingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Query is empty")]
    EmptyQuery,

    #[error("Invalid line range {start}-{end} in {file_path}")]
    InvalidRange {
        file_path: String,
        start: usize,
        end: usize,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Search cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, RetrievalError>;
