//! # Coderag Embeddings
//!
//! Embedding generation for semantic code search.
//!
//! The crate separates *what* produces vectors ([`EmbeddingProvider`]) from
//! *how* calls are made resilient ([`RetryingEmbedder`]):
//!
//! - Providers make exactly one request per call and report failures as
//!   [`EmbeddingError`] values.
//! - The retrying adapter classifies failures, backs off exponentially with
//!   jitter, and observes a `CancellationToken` while calling and sleeping.
//!
//! [`OpenAiEmbeddingProvider`] talks to an OpenAI-compatible HTTP API;
//! [`HashingEmbeddingProvider`] works offline.
//!
//! ## Example
//!
//! ```no_run
//! use coderag_embeddings::{OpenAiConfig, OpenAiEmbeddingProvider, RetryPolicy, RetryingEmbedder};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), coderag_embeddings::EmbeddingError> {
//!     let provider = OpenAiEmbeddingProvider::new(OpenAiConfig {
//!         api_key: std::env::var("OPENAI_API_KEY").unwrap_or_default(),
//!         ..Default::default()
//!     })?;
//!     let embedder = RetryingEmbedder::new(Arc::new(provider), RetryPolicy::default());
//!
//!     let texts = vec!["fn hello() { println!(\"Hello\"); }".to_string()];
//!     let embeddings = embedder.embed(&texts, &CancellationToken::new()).await?;
//!     println!("Generated {} embeddings", embeddings.len());
//!     Ok(())
//! }
//! ```

mod error;
mod hashing;
mod openai;
mod provider;
mod retry;

pub use error::EmbeddingError;
pub use error::is_retryable_message;
pub use hashing::DEFAULT_HASHING_DIMENSIONS;
pub use hashing::HashingEmbeddingProvider;
pub use openai::MAX_BATCH_SIZE;
pub use openai::OpenAiConfig;
pub use openai::OpenAiEmbeddingProvider;
pub use provider::EmbeddingModelInfo;
pub use provider::EmbeddingProvider;
pub use retry::RetryPolicy;
pub use retry::RetryingEmbedder;
