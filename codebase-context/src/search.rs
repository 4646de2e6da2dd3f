use async_trait::async_trait;
use coderag_codebase_retrieval::{SearchEngine, SemanticSearchRequest, SemanticSearchResponse};
use tokio_util::sync::CancellationToken;

/// The search surface the assembler draws candidates from.
#[async_trait]
pub trait CodeSearch: Send + Sync {
    async fn search(
        &self,
        request: &SemanticSearchRequest,
        cancel: &CancellationToken,
    ) -> coderag_codebase_retrieval::Result<SemanticSearchResponse>;
}

#[async_trait]
impl CodeSearch for SearchEngine {
    async fn search(
        &self,
        request: &SemanticSearchRequest,
        cancel: &CancellationToken,
    ) -> coderag_codebase_retrieval::Result<SemanticSearchResponse> {
        SearchEngine::search(self, request, cancel).await
    }
}
