use thiserror::Error;

/// Errors that can occur during code chunking
#[derive(Debug, Error)]
pub enum ChunkerError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}
