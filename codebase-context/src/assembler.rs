use crate::error::{ContextError, Result};
use crate::prompt::build_context_prompt;
use crate::ranking::{chunk_tokens, select_within_budget, sort_for_presentation};
use crate::search::CodeSearch;
use coderag_code_chunker::CodeChunk;
use coderag_codebase_retrieval::{
    FusionEngine, RerankWeights, Reranker, RetrievalConfig, SearchResult, SearchType,
    SemanticSearchRequest, SemanticSearchResponse,
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Configuration for context assembly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Budget for callers that do not pass their own
    #[serde(default = "default_token_budget")]
    pub token_budget: usize,

    /// Hybrid candidates fetched before budget selection
    #[serde(default = "default_context_top_k")]
    pub context_top_k: usize,

    #[serde(default = "default_context_min_score")]
    pub context_min_score: f32,

    /// `retrieve_and_rank` fetches `top_k * rank_multiplier` candidates
    #[serde(default = "default_rank_multiplier")]
    pub rank_multiplier: usize,

    #[serde(default = "default_rank_min_score")]
    pub rank_min_score: f32,

    /// RRF smoothing constant
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f32,

    #[serde(default)]
    pub rerank: RerankWeights,
}

fn default_token_budget() -> usize {
    2000
}

fn default_context_top_k() -> usize {
    50
}

fn default_context_min_score() -> f32 {
    0.3
}

fn default_rank_multiplier() -> usize {
    3
}

fn default_rank_min_score() -> f32 {
    0.2
}

fn default_rrf_k() -> f32 {
    60.0
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            token_budget: default_token_budget(),
            context_top_k: default_context_top_k(),
            context_min_score: default_context_min_score(),
            rank_multiplier: default_rank_multiplier(),
            rank_min_score: default_rank_min_score(),
            rrf_k: default_rrf_k(),
            rerank: RerankWeights::default(),
        }
    }
}

impl ContextConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.context_top_k == 0 {
            return Err("context_top_k must be greater than 0".to_string());
        }
        if self.rank_multiplier == 0 {
            return Err("rank_multiplier must be greater than 0".to_string());
        }
        if self.rrf_k <= 0.0 {
            return Err(format!("rrf_k must be positive, got {}", self.rrf_k));
        }
        Ok(())
    }
}

/// Budgeted context ready for a prompt
#[derive(Debug, Clone)]
pub struct ProvidedContext {
    /// Selected chunks in presentation order
    pub chunks: Vec<CodeChunk>,

    pub tokens_used: usize,

    /// Output of [`build_context_prompt`] for `chunks`
    pub formatted_context: String,
}

/// Turns search results into token-bounded prompt context
pub struct RagAssembler {
    config: ContextConfig,
    search: Arc<dyn CodeSearch>,
    retrieval: RetrievalConfig,
    fusion: FusionEngine,
    reranker: Reranker,
}

impl RagAssembler {
    pub fn new(config: ContextConfig, search: Arc<dyn CodeSearch>) -> Result<Self> {
        config.validate().map_err(ContextError::InvalidConfig)?;

        let retrieval = RetrievalConfig {
            rrf_k: config.rrf_k,
            ..Default::default()
        };
        let fusion = FusionEngine::new(&retrieval);
        let reranker = Reranker::new(config.rerank.clone());

        Ok(Self {
            config,
            search,
            retrieval,
            fusion,
            reranker,
        })
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Hybrid candidates selected greedily within `max_tokens`, returned
    /// ordered by file path and start line.
    pub async fn retrieve_context(
        &self,
        query: &str,
        root: &Path,
        max_tokens: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<CodeChunk>> {
        info!("Retrieving context for '{query}' (max_tokens={max_tokens})");

        let request = SemanticSearchRequest::new(query, root)
            .with_search_type(SearchType::Hybrid)
            .with_top_k(self.config.context_top_k)
            .with_min_score(self.config.context_min_score);
        let response = self.search.search(&request, cancel).await?;

        let (mut chunks, tokens_used) = select_within_budget(response.results, max_tokens);
        sort_for_presentation(&mut chunks);

        info!(
            "Selected {} chunks using {tokens_used}/{max_tokens} tokens",
            chunks.len()
        );
        Ok(chunks)
    }

    /// Semantic candidates (`top_k * rank_multiplier`) reranked and cut to
    /// `top_k`.
    pub async fn retrieve_and_rank(
        &self,
        query: &str,
        root: &Path,
        top_k: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResult>> {
        debug!("Retrieve and rank '{query}' (top_k={top_k})");

        let request = SemanticSearchRequest::new(query, root)
            .with_search_type(SearchType::Semantic)
            .with_top_k(top_k.saturating_mul(self.config.rank_multiplier))
            .with_min_score(self.config.rank_min_score);
        let response = self.search.search(&request, cancel).await?;
        if response.is_empty() {
            return Ok(Vec::new());
        }

        let mut results = self.reranker.rerank(query, response.results);
        results.truncate(top_k);
        Ok(results)
    }

    /// Reciprocal Rank Fusion of semantic (`2 * top_k`) and keyword (`top_k`)
    /// results, reranked, then cut to `top_k`.
    ///
    /// A failing keyword search is logged and treated as empty.
    pub async fn hybrid_search(
        &self,
        request: &SemanticSearchRequest,
        cancel: &CancellationToken,
    ) -> Result<SemanticSearchResponse> {
        let start = Instant::now();
        let top_k = self.retrieval.effective_top_k(request.top_k);
        info!("Hybrid search for '{}' (top_k={top_k})", request.query);

        let semantic_request = SemanticSearchRequest {
            search_type: SearchType::Semantic,
            top_k: top_k.saturating_mul(2),
            ..request.clone()
        };
        let semantic = self.search.search(&semantic_request, cancel).await?;

        let keyword_request = SemanticSearchRequest {
            search_type: SearchType::Keyword,
            top_k,
            ..request.clone()
        };
        let keyword = match self.search.search(&keyword_request, cancel).await {
            Ok(response) => response.results,
            Err(e) => {
                warn!("Keyword search failed: {e}");
                Vec::new()
            }
        };

        let fused = self.fusion.reciprocal_rank(semantic.results, keyword);
        let mut results = self.reranker.rerank(&request.query, fused);
        results.truncate(top_k);

        Ok(SemanticSearchResponse::new(
            results,
            start.elapsed(),
            SearchType::Hybrid,
        ))
    }

    /// [`Self::retrieve_context`] plus the rendered prompt section.
    pub async fn provide_context(
        &self,
        query: &str,
        root: &Path,
        max_tokens: usize,
        cancel: &CancellationToken,
    ) -> Result<ProvidedContext> {
        let chunks = self.retrieve_context(query, root, max_tokens, cancel).await?;
        let tokens_used = chunks.iter().map(chunk_tokens).sum();
        let formatted_context = build_context_prompt(&chunks);

        Ok(ProvidedContext {
            chunks,
            tokens_used,
            formatted_context,
        })
    }
}
