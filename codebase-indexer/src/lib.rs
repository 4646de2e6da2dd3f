/*!
# Codebase Indexer

Turns a project directory into embedded chunks in a vector store.

## Features

- **Symbol-aware chunking**: chunks follow function and type boundaries found by tree-sitter grammars; code between symbols becomes block chunks
- **Batched embedding**: one embedding call and one store write per batch of files
- **Fault isolation**: a failed batch is logged and skipped, the run continues
- **Cancellation**: runs stop between batches and during embedding retries
- **Progress tracking**: per-project state with at most one live run per project

## Example

```rust,no_run
use coderag_codebase_indexer::{IndexerConfig, SemanticIndexer, TreeSitterSymbolIndex};
use coderag_embeddings::{OpenAiConfig, OpenAiEmbeddingProvider, RetryPolicy, RetryingEmbedder};
use coderag_vector_store::InMemoryVectorStore;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let provider = OpenAiEmbeddingProvider::new(OpenAiConfig {
        api_key: std::env::var("OPENAI_API_KEY")?,
        ..Default::default()
    })?;
    let embedder = Arc::new(RetryingEmbedder::new(Arc::new(provider), RetryPolicy::default()));

    let indexer = SemanticIndexer::new(
        IndexerConfig::default(),
        embedder,
        Arc::new(InMemoryVectorStore::new()),
    )?
    .with_symbol_index(Arc::new(TreeSitterSymbolIndex::default()));

    let stats = indexer
        .index_project(Path::new("./my-project"), &CancellationToken::new())
        .await?;

    println!("Indexed {} files, stored {} chunks",
        stats.files_processed, stats.chunks_stored);

    Ok(())
}
```
*/

mod config;
mod discovery;
mod error;
mod indexer;
mod state;
mod symbols;

pub use config::IndexerConfig;
pub use discovery::discover_files;
pub use error::{IndexerError, Result};
pub use indexer::{IndexStats, SemanticIndexer, embedding_text};
pub use state::{IndexingGuard, IndexingRegistry, IndexingState};
pub use symbols::{Symbol, SymbolIndex, TreeSitterSymbolIndex, extract_symbols};

use std::path::{Path, PathBuf};

/// Absolute form of `root`, used as the identity of a project.
pub fn normalize_root(root: &Path) -> PathBuf {
    std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf())
}

/// Stable project id: first 8 bytes of SHA-256 over the absolute root path, hex encoded.
pub fn project_id(root: &Path) -> String {
    let root = normalize_root(root);
    coderag_code_chunker::short_digest(root.to_string_lossy().as_bytes(), 8)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_id_is_stable() {
        let id = project_id(Path::new("/srv/projects/app"));
        assert_eq!(id.len(), 16);
        assert_eq!(id, project_id(Path::new("/srv/projects/app")));
        assert_ne!(id, project_id(Path::new("/srv/projects/other")));
    }
}
