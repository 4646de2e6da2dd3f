use crate::filters::SearchFilters;
use coderag_code_chunker::CodeChunk;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Retrieval strategy requested by a caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchType {
    /// Vector similarity against embedded chunks
    #[default]
    Semantic,
    /// Symbol-name lookup
    Keyword,
    /// Both, fused
    Hybrid,
}

impl SearchType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::Keyword => "keyword",
            Self::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for SearchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "semantic" => Ok(Self::Semantic),
            "keyword" => Ok(Self::Keyword),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(format!("unknown search type: {other}")),
        }
    }
}

/// Source of a search result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchSource {
    /// From semantic/vector search
    Semantic,
    /// From symbol-name search
    Keyword,
    /// From hybrid fusion
    Hybrid,
}

/// A single search result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The code chunk found
    pub chunk: CodeChunk,

    /// Relevance score, higher is better
    pub score: f32,

    /// Source of this result
    pub source: SearchSource,

    /// Rank in the result list (0 = best)
    pub rank: usize,
}

impl SearchResult {
    /// Create new search result
    pub fn new(chunk: CodeChunk, score: f32, source: SearchSource) -> Self {
        Self {
            chunk,
            score,
            source,
            rank: 0,
        }
    }

    /// Set rank
    pub fn with_rank(mut self, rank: usize) -> Self {
        self.rank = rank;
        self
    }
}

/// Number results by their position.
pub(crate) fn assign_ranks(results: &mut [SearchResult]) {
    for (rank, result) in results.iter_mut().enumerate() {
        result.rank = rank;
    }
}

/// Sort best first; equal scores keep their relative order.
pub(crate) fn sort_by_score(results: &mut [SearchResult]) {
    results.sort_by(|a, b| b.score.total_cmp(&a.score));
}

/// Parameters of one search call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticSearchRequest {
    pub query: String,

    pub project_root: PathBuf,

    /// Maximum results; 0 means the configured default
    #[serde(default)]
    pub top_k: usize,

    /// Similarity floor for vector hits; 0 means the configured default
    #[serde(default)]
    pub min_score: f32,

    #[serde(default)]
    pub search_type: SearchType,

    #[serde(default)]
    pub filters: Option<SearchFilters>,
}

impl SemanticSearchRequest {
    pub fn new(query: impl Into<String>, project_root: impl Into<PathBuf>) -> Self {
        Self {
            query: query.into(),
            project_root: project_root.into(),
            top_k: 0,
            min_score: 0.0,
            search_type: SearchType::default(),
            filters: None,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_min_score(mut self, min_score: f32) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn with_search_type(mut self, search_type: SearchType) -> Self {
        self.search_type = search_type;
        self
    }

    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = Some(filters);
        self
    }
}

/// Ranked results of one search call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemanticSearchResponse {
    pub results: Vec<SearchResult>,

    pub total_results: usize,

    /// Wall-clock time spent answering
    pub query_time: Duration,

    /// Strategy actually used
    pub search_type: SearchType,
}

impl SemanticSearchResponse {
    pub fn new(results: Vec<SearchResult>, query_time: Duration, search_type: SearchType) -> Self {
        Self {
            total_results: results.len(),
            results,
            query_time,
            search_type,
        }
    }

    /// Get top N results
    pub fn top(&self, n: usize) -> &[SearchResult] {
        &self.results[..n.min(self.results.len())]
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Find code resembling a line range of an indexed file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarCodeRequest {
    pub project_root: PathBuf,

    /// Path relative to the project root
    pub file_path: String,

    pub start_line: usize,

    pub end_line: usize,

    #[serde(default)]
    pub top_k: usize,

    #[serde(default)]
    pub min_score: f32,

    /// Leave the source range itself out of the results
    #[serde(default = "default_exclude_self")]
    pub exclude_self: bool,
}

fn default_exclude_self() -> bool {
    true
}

impl SimilarCodeRequest {
    pub fn new(
        project_root: impl Into<PathBuf>,
        file_path: impl Into<String>,
        start_line: usize,
        end_line: usize,
    ) -> Self {
        Self {
            project_root: project_root.into(),
            file_path: file_path.into(),
            start_line,
            end_line,
            top_k: 0,
            min_score: 0.0,
            exclude_self: default_exclude_self(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn create_test_chunk(path: &str) -> CodeChunk {
        CodeChunk::new(path, 1, 5, "fn test() {}", "rust", 3)
    }

    #[test]
    fn test_search_result_with_rank() {
        let result = SearchResult::new(create_test_chunk("test.rs"), 0.8, SearchSource::Keyword)
            .with_rank(5);

        assert_eq!(result.rank, 5);
        assert_eq!(result.source, SearchSource::Keyword);
    }

    #[test]
    fn test_sort_is_stable_for_ties() {
        let mut results = vec![
            SearchResult::new(create_test_chunk("a.rs"), 0.5, SearchSource::Hybrid),
            SearchResult::new(create_test_chunk("b.rs"), 0.9, SearchSource::Hybrid),
            SearchResult::new(create_test_chunk("c.rs"), 0.5, SearchSource::Hybrid),
        ];
        sort_by_score(&mut results);
        assign_ranks(&mut results);

        let order: Vec<(&str, usize)> = results
            .iter()
            .map(|r| (r.chunk.file_path.as_str(), r.rank))
            .collect();
        assert_eq!(order, vec![("b.rs", 0), ("a.rs", 1), ("c.rs", 2)]);
    }

    #[test]
    fn test_search_type_parsing() {
        assert_eq!("Hybrid".parse::<SearchType>(), Ok(SearchType::Hybrid));
        assert_eq!("keyword".parse::<SearchType>(), Ok(SearchType::Keyword));
        assert!("fuzzy".parse::<SearchType>().is_err());
        assert_eq!(SearchType::default().to_string(), "semantic");
    }

    #[test]
    fn test_response_top() {
        let results = vec![
            SearchResult::new(create_test_chunk("a.rs"), 0.9, SearchSource::Semantic),
            SearchResult::new(create_test_chunk("b.rs"), 0.8, SearchSource::Semantic),
        ];
        let response =
            SemanticSearchResponse::new(results, Duration::from_millis(3), SearchType::Semantic);

        assert_eq!(response.total_results, 2);
        assert_eq!(response.top(1).len(), 1);
        assert_eq!(response.top(5).len(), 2);
    }
}
