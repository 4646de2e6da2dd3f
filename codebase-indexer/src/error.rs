use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Chunker error: {0}")]
    Chunker(#[from] coderag_code_chunker::ChunkerError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] coderag_embeddings::EmbeddingError),

    #[error("Vector store error: {0}")]
    VectorStore(#[from] coderag_vector_store::VectorStoreError),

    #[error("Indexing already in progress for project {0}")]
    AlreadyInProgress(String),

    #[error("Indexing cancelled")]
    Cancelled,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

pub type Result<T> = std::result::Result<T, IndexerError>;
