use crate::config::RetrievalConfig;
use crate::result::{SearchResult, SearchSource, assign_ranks, sort_by_score};
use log::debug;
use std::collections::HashMap;

/// Combines semantic and keyword result lists.
///
/// Neither strategy truncates: callers decide whether to rerank first. Equal
/// scores keep first-seen order, semantic list first.
#[derive(Debug, Clone)]
pub struct FusionEngine {
    semantic_weight: f32,
    keyword_weight: f32,
    rrf_k: f32,
}

impl FusionEngine {
    /// Create new fusion engine
    pub fn new(config: &RetrievalConfig) -> Self {
        Self {
            semantic_weight: config.semantic_weight,
            keyword_weight: config.keyword_weight,
            rrf_k: config.rrf_k,
        }
    }

    /// Weighted linear fusion keyed by `(file_path, start_line)`.
    ///
    /// score(d) = semantic_weight * semantic(d) + keyword_weight * keyword(d)
    pub fn weighted_linear(
        &self,
        semantic_results: Vec<SearchResult>,
        keyword_results: Vec<SearchResult>,
    ) -> Vec<SearchResult> {
        debug!(
            "Weighted fusion: {} semantic + {} keyword",
            semantic_results.len(),
            keyword_results.len()
        );

        let mut merged = Merged::default();
        for result in semantic_results {
            let key = (result.chunk.file_path.clone(), result.chunk.start_line, None);
            let score = result.score * self.semantic_weight;
            merged.add(key, result, score);
        }
        for result in keyword_results {
            let key = (result.chunk.file_path.clone(), result.chunk.start_line, None);
            let score = result.score * self.keyword_weight;
            merged.add(key, result, score);
        }

        merged.into_ranked()
    }

    /// Reciprocal Rank Fusion keyed by `(file_path, start_line, end_line)`.
    ///
    /// RRF(d) = Σ 1 / (k + rank(d) + 1), rank 0-based in each list
    pub fn reciprocal_rank(
        &self,
        semantic_results: Vec<SearchResult>,
        keyword_results: Vec<SearchResult>,
    ) -> Vec<SearchResult> {
        debug!(
            "RRF fusion: {} semantic + {} keyword",
            semantic_results.len(),
            keyword_results.len()
        );

        let mut merged = Merged::default();
        for list in [semantic_results, keyword_results] {
            for (rank, result) in list.into_iter().enumerate() {
                let key = (
                    result.chunk.file_path.clone(),
                    result.chunk.start_line,
                    Some(result.chunk.end_line),
                );
                let score = 1.0 / (self.rrf_k + rank as f32 + 1.0);
                merged.add(key, result, score);
            }
        }

        let results = merged.into_ranked();
        debug!("RRF produced {} results", results.len());
        results
    }
}

type ChunkKey = (String, usize, Option<usize>);

/// Accumulated scores in first-seen order.
#[derive(Default)]
struct Merged {
    index: HashMap<ChunkKey, usize>,
    results: Vec<SearchResult>,
}

impl Merged {
    fn add(&mut self, key: ChunkKey, result: SearchResult, score: f32) {
        match self.index.get(&key) {
            Some(&position) => self.results[position].score += score,
            None => {
                self.index.insert(key, self.results.len());
                self.results.push(SearchResult {
                    score,
                    source: SearchSource::Hybrid,
                    ..result
                });
            }
        }
    }

    fn into_ranked(mut self) -> Vec<SearchResult> {
        sort_by_score(&mut self.results);
        assign_ranks(&mut self.results);
        self.results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coderag_code_chunker::CodeChunk;
    use pretty_assertions::assert_eq;

    fn create_search_result(path: &str, line: usize, score: f32, source: SearchSource) -> SearchResult {
        let chunk = CodeChunk::new(path, line, line + 5, "test code", "rust", 30);
        SearchResult::new(chunk, score, source)
    }

    fn engine() -> FusionEngine {
        FusionEngine::new(&RetrievalConfig::default())
    }

    fn paths(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.chunk.file_path.as_str()).collect()
    }

    #[test]
    fn test_weighted_fusion_is_additive() {
        let semantic = vec![create_search_result("a.rs", 1, 0.8, SearchSource::Semantic)];
        let keyword = vec![create_search_result("a.rs", 1, 1.0, SearchSource::Keyword)];

        let results = engine().weighted_linear(semantic, keyword);

        assert_eq!(results.len(), 1);
        // 0.8 * 0.7 + 1.0 * 0.3
        assert!((results[0].score - 0.86).abs() < 1e-5);
        assert_eq!(results[0].source, SearchSource::Hybrid);
    }

    #[test]
    fn test_weighted_fusion_keys_on_start_line() {
        let semantic = vec![create_search_result("a.rs", 10, 0.9, SearchSource::Semantic)];
        // same start, different end: still the same chunk for linear fusion
        let mut keyword = create_search_result("a.rs", 10, 1.0, SearchSource::Keyword);
        keyword.chunk.end_line = 40;

        let results = engine().weighted_linear(semantic, vec![keyword]);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_rrf_rewards_presence_in_both_lists() {
        let semantic = vec![
            create_search_result("both.rs", 1, 0.9, SearchSource::Semantic),
            create_search_result("semantic.rs", 1, 0.8, SearchSource::Semantic),
        ];
        let keyword = vec![
            create_search_result("both.rs", 1, 1.0, SearchSource::Keyword),
            create_search_result("keyword.rs", 1, 1.0, SearchSource::Keyword),
        ];

        let results = engine().reciprocal_rank(semantic, keyword);

        assert_eq!(paths(&results), vec!["both.rs", "semantic.rs", "keyword.rs"]);
        assert!((results[0].score - 2.0 / 61.0).abs() < 1e-6);
        // any single-list chunk scores at most 1 / 61
        assert!(results[1..].iter().all(|r| r.score <= 1.0 / 61.0 + 1e-7));
        assert!(results[0].score > results[1].score);
        assert_eq!(results.iter().map(|r| r.rank).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_rrf_ties_keep_semantic_first() {
        let semantic = vec![create_search_result("s.rs", 1, 0.9, SearchSource::Semantic)];
        let keyword = vec![create_search_result("k.rs", 1, 1.0, SearchSource::Keyword)];

        let results = engine().reciprocal_rank(semantic, keyword);
        assert_eq!(paths(&results), vec!["s.rs", "k.rs"]);
    }

    #[test]
    fn test_empty_inputs() {
        assert!(engine().reciprocal_rank(vec![], vec![]).is_empty());
        assert!(engine().weighted_linear(vec![], vec![]).is_empty());
    }
}
