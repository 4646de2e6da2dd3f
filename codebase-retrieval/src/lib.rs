/*!
# Codebase Retrieval

Search over an indexed codebase, combining:
- **Semantic search** via vector embeddings for conceptual similarity
- **Keyword search** via the symbol index for exact names
- **Weighted linear fusion** for the primary hybrid search
- **Reciprocal Rank Fusion (RRF)** for hybrid retrieval feeding a reranker
- **Lexical reranking** for relevance refinement

## Architecture

```text
Query
  ├─> Semantic Search (embeddings, top_k * 2)
  │     └─> Filters
  ├─> Keyword Search (symbol names, score 1.0)
  │     └─> Filters
  └─> Fusion
        ├─> Weighted linear (0.7 / 0.3) ──> top_k
        └─> RRF (k = 60) ──> Reranking ──> top_k
```

## Example

```rust,no_run
use coderag_codebase_indexer::TreeSitterSymbolIndex;
use coderag_codebase_retrieval::{RetrievalConfig, SearchEngine, SearchType, SemanticSearchRequest};
use coderag_embeddings::{HashingEmbeddingProvider, RetryPolicy, RetryingEmbedder};
use coderag_vector_store::InMemoryVectorStore;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let embedder = Arc::new(RetryingEmbedder::new(
        Arc::new(HashingEmbeddingProvider::default()),
        RetryPolicy::default(),
    ));
    let store = Arc::new(InMemoryVectorStore::open(std::path::Path::new("vectors.json")).await?);

    let engine = SearchEngine::new(RetrievalConfig::default(), embedder, store)?
        .with_symbol_index(Arc::new(TreeSitterSymbolIndex::default()));

    let request = SemanticSearchRequest::new("async function error handling", "./my-project")
        .with_search_type(SearchType::Hybrid)
        .with_top_k(5);
    let response = engine.search(&request, &CancellationToken::new()).await?;

    for (i, result) in response.results.iter().enumerate() {
        println!("{}. {} (score: {:.2})", i + 1, result.chunk.file_path, result.score);
    }

    Ok(())
}
```
*/

mod config;
mod engine;
mod error;
mod filters;
mod fusion;
mod rerank;
mod result;

pub use config::RetrievalConfig;
pub use engine::SearchEngine;
pub use error::{Result, RetrievalError};
pub use filters::SearchFilters;
pub use fusion::FusionEngine;
pub use rerank::{RerankWeights, Reranker};
pub use result::{
    SearchResult, SearchSource, SearchType, SemanticSearchRequest, SemanticSearchResponse,
    SimilarCodeRequest,
};
