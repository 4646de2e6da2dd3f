use thiserror::Error;

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("Retrieval error: {0}")]
    Retrieval(#[from] coderag_codebase_retrieval::RetrievalError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, ContextError>;
