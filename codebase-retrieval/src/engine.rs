use crate::config::RetrievalConfig;
use crate::error::{Result, RetrievalError};
use crate::filters::{SearchFilters, apply_filters};
use crate::fusion::FusionEngine;
use crate::result::{
    SearchResult, SearchSource, SearchType, SemanticSearchRequest, SemanticSearchResponse,
    SimilarCodeRequest,
};
use coderag_code_chunker::{CharTokenEstimator, CodeChunk, Language, TokenEstimator};
use coderag_codebase_indexer::{SymbolIndex, normalize_root, project_id};
use coderag_embeddings::{EmbeddingError, RetryingEmbedder};
use coderag_vector_store::{VectorStore, VectorStoreStats};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Semantic, keyword and hybrid search over an indexed project
pub struct SearchEngine {
    config: RetrievalConfig,
    embedder: Arc<RetryingEmbedder>,
    store: Arc<dyn VectorStore>,
    symbol_index: Option<Arc<dyn SymbolIndex>>,
    fusion: FusionEngine,
}

impl SearchEngine {
    pub fn new(
        config: RetrievalConfig,
        embedder: Arc<RetryingEmbedder>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        config.validate().map_err(RetrievalError::InvalidConfig)?;

        Ok(Self {
            fusion: FusionEngine::new(&config),
            config,
            embedder,
            store,
            symbol_index: None,
        })
    }

    /// Enable keyword search through `index`.
    pub fn with_symbol_index(mut self, index: Arc<dyn SymbolIndex>) -> Self {
        self.symbol_index = Some(index);
        self
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Run a search with the strategy named in `request`.
    pub async fn search(
        &self,
        request: &SemanticSearchRequest,
        cancel: &CancellationToken,
    ) -> Result<SemanticSearchResponse> {
        let start = Instant::now();
        let root = normalize_root(&request.project_root);
        let top_k = self.config.effective_top_k(request.top_k);
        let min_score = self.config.effective_min_score(request.min_score);
        let filters = request.filters.as_ref();

        debug!(
            "{} search for '{}' in {} (top_k={top_k}, min_score={min_score})",
            request.search_type,
            request.query,
            root.display()
        );

        let results = match request.search_type {
            SearchType::Semantic => {
                self.semantic_search(&root, &request.query, top_k, min_score, filters, cancel)
                    .await?
            }
            SearchType::Keyword => {
                self.keyword_search(&root, &request.query, top_k, filters)
                    .await?
            }
            SearchType::Hybrid => {
                self.linear_hybrid_search(&root, &request.query, top_k, min_score, filters, cancel)
                    .await?
            }
        };

        let response =
            SemanticSearchResponse::new(results, start.elapsed(), request.search_type);
        info!(
            "{} search returned {} results in {}ms",
            response.search_type,
            response.total_results,
            response.query_time.as_millis()
        );
        Ok(response)
    }

    /// Vector search for `top_k * 2` candidates, filtered, truncated to `top_k`.
    pub async fn semantic_search(
        &self,
        root: &Path,
        query: &str,
        top_k: usize,
        min_score: f32,
        filters: Option<&SearchFilters>,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResult>> {
        if query.trim().is_empty() {
            return Err(RetrievalError::EmptyQuery);
        }

        let vector = self.embed(query, cancel).await?;
        let hits = self
            .store
            .search(&project_id(root), &vector, top_k.saturating_mul(2), min_score)
            .await?;
        debug!("Vector search found {} candidates", hits.len());

        let results = hits
            .into_iter()
            .map(|hit| SearchResult::new(hit.chunk, hit.score, SearchSource::Semantic))
            .collect();

        let mut results = apply_filters(filters, results);
        results.truncate(top_k);
        Ok(results)
    }

    /// Symbol-name matches, each scored 1.0, with content read from disk.
    ///
    /// Without a symbol index there are no keyword results.
    pub async fn keyword_search(
        &self,
        root: &Path,
        query: &str,
        top_k: usize,
        filters: Option<&SearchFilters>,
    ) -> Result<Vec<SearchResult>> {
        let Some(symbol_index) = &self.symbol_index else {
            return Ok(Vec::new());
        };

        let symbols = symbol_index.search_by_name(root, query).await?;
        debug!("Symbol index matched {} symbols", symbols.len());

        let mut files: HashMap<String, Option<Vec<String>>> = HashMap::new();
        let mut results = Vec::with_capacity(symbols.len());

        for symbol in symbols {
            if !files.contains_key(&symbol.file_path) {
                let lines = match tokio::fs::read_to_string(root.join(&symbol.file_path)).await {
                    Ok(content) => Some(content.lines().map(String::from).collect()),
                    Err(e) => {
                        warn!("Skipping keyword match in {}: {e}", symbol.file_path);
                        None
                    }
                };
                files.insert(symbol.file_path.clone(), lines);
            }
            let Some(Some(lines)) = files.get(&symbol.file_path) else {
                continue;
            };

            let start_line = symbol.start_line.max(1);
            let end_line = symbol.end_line.min(lines.len());
            if start_line > end_line {
                debug!(
                    "Skipping {} in {}: range {}-{} outside {} lines",
                    symbol.name,
                    symbol.file_path,
                    symbol.start_line,
                    symbol.end_line,
                    lines.len()
                );
                continue;
            }

            let content = lines[start_line - 1..end_line].join("\n");
            let token_count = CharTokenEstimator.estimate(&content);
            let language = Language::from_path(Path::new(&symbol.file_path));
            let chunk = CodeChunk::new(
                &symbol.file_path,
                start_line,
                end_line,
                content,
                language.name(),
                token_count,
            )
            .with_symbol(&symbol.name, &symbol.kind);

            results.push(SearchResult::new(chunk, 1.0, SearchSource::Keyword));
        }

        let mut results = apply_filters(filters, results);
        results.truncate(top_k);
        Ok(results)
    }

    /// Weighted linear fusion of semantic (`2 * top_k`) and keyword (`top_k`)
    /// results. A failing keyword search degrades to semantic-only.
    async fn linear_hybrid_search(
        &self,
        root: &Path,
        query: &str,
        top_k: usize,
        min_score: f32,
        filters: Option<&SearchFilters>,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResult>> {
        let semantic = self
            .semantic_search(root, query, top_k.saturating_mul(2), min_score, filters, cancel)
            .await?;
        let keyword = self
            .keyword_search(root, query, top_k, filters)
            .await
            .unwrap_or_else(|e| {
                warn!("Keyword search failed, using semantic results only: {e}");
                Vec::new()
            });

        let mut results = self.fusion.weighted_linear(semantic, keyword);
        results.truncate(top_k);
        Ok(results)
    }

    /// Chunks resembling a line range of a project file.
    pub async fn find_similar(
        &self,
        request: &SimilarCodeRequest,
        cancel: &CancellationToken,
    ) -> Result<Vec<SearchResult>> {
        let root = normalize_root(&request.project_root);
        let top_k = self.config.effective_top_k(request.top_k);
        let min_score = self.config.effective_min_score(request.min_score);

        let content = tokio::fs::read_to_string(root.join(&request.file_path)).await?;
        let lines: Vec<&str> = content.lines().collect();
        let start_line = request.start_line.max(1);
        let end_line = request.end_line.min(lines.len());
        if start_line > end_line {
            return Err(RetrievalError::InvalidRange {
                file_path: request.file_path.clone(),
                start: request.start_line,
                end: request.end_line,
            });
        }

        let snippet = lines[start_line - 1..end_line].join("\n");
        let vector = self.embed(&snippet, cancel).await?;

        let fetch = if request.exclude_self { top_k.saturating_add(1) } else { top_k };
        let hits = self
            .store
            .search(&project_id(&root), &vector, fetch, min_score)
            .await?;

        let mut results: Vec<SearchResult> = hits
            .into_iter()
            .filter(|hit| {
                !request.exclude_self
                    || !(hit.chunk.file_path == request.file_path
                        && hit.chunk.start_line == request.start_line
                        && hit.chunk.end_line == request.end_line)
            })
            .map(|hit| SearchResult::new(hit.chunk, hit.score, SearchSource::Semantic))
            .collect();
        results.truncate(top_k);

        debug!(
            "Found {} chunks similar to {}:{}-{}",
            results.len(),
            request.file_path,
            request.start_line,
            request.end_line
        );
        Ok(results)
    }

    pub async fn get_stats(&self, root: &Path) -> Result<VectorStoreStats> {
        Ok(self.store.get_stats(&project_id(root)).await?)
    }

    pub async fn is_indexed(&self, root: &Path) -> Result<bool> {
        Ok(self.get_stats(root).await?.total_chunks > 0)
    }

    async fn embed(&self, text: &str, cancel: &CancellationToken) -> Result<Vec<f32>> {
        match self.embedder.embed_one(text, cancel).await {
            Ok(vector) => Ok(vector),
            Err(EmbeddingError::Cancelled) => Err(RetrievalError::Cancelled),
            Err(e) => Err(e.into()),
        }
    }
}
