//! # Coderag Vector Store
//!
//! Vector storage and similarity search for embedded code chunks.
//!
//! The [`VectorStore`] trait is what the indexer writes to and the search
//! engine reads from. [`InMemoryVectorStore`] keeps each project's chunks in
//! a map keyed by chunk id, ranks by cosine similarity, and can persist itself
//! as a JSON snapshot.
//!
//! ## Example
//!
//! ```no_run
//! use coderag_vector_store::{InMemoryVectorStore, VectorStore};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), coderag_vector_store::VectorStoreError> {
//!     let store = InMemoryVectorStore::open(Path::new(".coderag/vectors.json")).await?;
//!
//!     let results = store.search("3f2a9c0d1b7e4a55", &[0.1, 0.9, 0.0], 5, 0.5).await?;
//!     println!("Found {} similar code snippets", results.len());
//!     Ok(())
//! }
//! ```

mod chunk;
mod error;
mod store;

pub use chunk::{EmbeddedChunk, ScoredChunk, VectorStoreStats, cosine_similarity};
pub use error::VectorStoreError;
pub use store::{InMemoryVectorStore, VectorStore};
