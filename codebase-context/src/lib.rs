/*!
# Codebase Context

Assembles retrieved code into prompt-ready context for a language model.

## Features

- **Token budgets**: greedy selection that never exceeds the caller's limit
- **Deterministic output**: selected chunks are presented by file and line
- **Two-stage ranking**: semantic candidates reranked on lexical signals
- **RRF hybrid search**: semantic and keyword lists fused by rank, then reranked
- **Prompt rendering**: Markdown sections grouped by file

## Architecture

```text
Query
  └─> CodeSearch (semantic | keyword | hybrid)
        └─> Reciprocal Rank Fusion / Reranker
              └─> Token Budget (skip what does not fit)
                    └─> Presentation order (file, line)
                          └─> build_context_prompt
```

## Example

```rust,no_run
use coderag_codebase_context::{ContextConfig, RagAssembler};
use coderag_codebase_retrieval::{RetrievalConfig, SearchEngine};
use coderag_embeddings::{HashingEmbeddingProvider, RetryPolicy, RetryingEmbedder};
use coderag_vector_store::InMemoryVectorStore;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let embedder = Arc::new(RetryingEmbedder::new(
        Arc::new(HashingEmbeddingProvider::default()),
        RetryPolicy::default(),
    ));
    let store = Arc::new(InMemoryVectorStore::open(Path::new("vectors.json")).await?);
    let engine = SearchEngine::new(RetrievalConfig::default(), embedder, store)?;

    let assembler = RagAssembler::new(ContextConfig::default(), Arc::new(engine))?;
    let context = assembler
        .provide_context("how are errors retried?", Path::new("."), 2000, &CancellationToken::new())
        .await?;

    println!("{}", context.formatted_context);
    Ok(())
}
```
*/

mod assembler;
mod error;
mod prompt;
mod ranking;
mod search;

pub use assembler::{ContextConfig, ProvidedContext, RagAssembler};
pub use error::{ContextError, Result};
pub use prompt::build_context_prompt;
pub use ranking::{chunk_tokens, select_within_budget, sort_for_presentation};
pub use search::CodeSearch;
