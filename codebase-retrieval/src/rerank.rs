use crate::result::{SearchResult, assign_ranks, sort_by_score};
use log::debug;
use serde::{Deserialize, Serialize};

/// Additive score adjustments applied by [`Reranker`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RerankWeights {
    /// Added when any query term occurs in the symbol name
    #[serde(default = "default_symbol_match")]
    pub symbol_match: f32,

    /// Scaled by the fraction of query terms found in the content
    #[serde(default = "default_content_match")]
    pub content_match: f32,

    /// Added for functions and methods
    #[serde(default = "default_callable_bonus")]
    pub callable_bonus: f32,

    /// Subtracted from chunks above `large_chunk_tokens`
    #[serde(default = "default_large_chunk_penalty")]
    pub large_chunk_penalty: f32,

    #[serde(default = "default_large_chunk_tokens")]
    pub large_chunk_tokens: usize,
}

fn default_symbol_match() -> f32 {
    0.15
}

fn default_content_match() -> f32 {
    0.1
}

fn default_callable_bonus() -> f32 {
    0.05
}

fn default_large_chunk_penalty() -> f32 {
    0.02
}

fn default_large_chunk_tokens() -> usize {
    400
}

impl Default for RerankWeights {
    fn default() -> Self {
        Self {
            symbol_match: default_symbol_match(),
            content_match: default_content_match(),
            callable_bonus: default_callable_bonus(),
            large_chunk_penalty: default_large_chunk_penalty(),
            large_chunk_tokens: default_large_chunk_tokens(),
        }
    }
}

/// Lexical reranking of fused candidates. Pure: no I/O, no model calls.
#[derive(Debug, Clone, Default)]
pub struct Reranker {
    weights: RerankWeights,
}

impl Reranker {
    pub fn new(weights: RerankWeights) -> Self {
        Self { weights }
    }

    /// Adjust scores and re-sort; equal scores keep their input order.
    pub fn rerank(&self, query: &str, mut results: Vec<SearchResult>) -> Vec<SearchResult> {
        debug!("Reranking {} results", results.len());

        let query_lower = query.to_lowercase();
        let terms: Vec<&str> = query_lower.split_whitespace().collect();

        for result in &mut results {
            let features = Self::extract_features(&terms, result);
            result.score += self.adjustment(&features, terms.len());
        }

        sort_by_score(&mut results);
        assign_ranks(&mut results);
        results
    }

    fn extract_features(terms: &[&str], result: &SearchResult) -> ContextualFeatures {
        let chunk = &result.chunk;
        let content_lower = chunk.content.to_lowercase();
        let symbol_lower = chunk.symbol_name.as_deref().map(str::to_lowercase);

        ContextualFeatures {
            symbol_match: symbol_lower
                .is_some_and(|name| terms.iter().any(|term| name.contains(term))),
            terms_in_content: terms
                .iter()
                .filter(|term| content_lower.contains(*term))
                .count(),
            is_callable: chunk.chunk_type.is_callable(),
            token_count: chunk.token_count,
        }
    }

    fn adjustment(&self, features: &ContextualFeatures, total_terms: usize) -> f32 {
        let mut delta = 0.0;

        if features.symbol_match {
            delta += self.weights.symbol_match;
        }

        if total_terms > 0 {
            let coverage = features.terms_in_content as f32 / total_terms as f32;
            delta += coverage * self.weights.content_match;
        }

        if features.is_callable {
            delta += self.weights.callable_bonus;
        }

        if features.token_count > self.weights.large_chunk_tokens {
            delta -= self.weights.large_chunk_penalty;
        }

        delta
    }
}

/// Lexical features of one candidate
#[derive(Debug)]
struct ContextualFeatures {
    symbol_match: bool,
    terms_in_content: usize,
    is_callable: bool,
    token_count: usize,
}
