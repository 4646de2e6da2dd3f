use crate::rerank::RerankWeights;
use serde::{Deserialize, Serialize};

/// Configuration for search and fusion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Result count used when a request asks for 0
    #[serde(default = "default_top_k")]
    pub default_top_k: usize,

    /// Similarity floor used when a request asks for 0
    #[serde(default = "default_min_score")]
    pub default_min_score: f32,

    /// Weight of semantic scores in linear hybrid fusion (0.0 - 1.0)
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,

    /// Weight of keyword scores in linear hybrid fusion (0.0 - 1.0)
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f32,

    /// RRF constant k (higher = less emphasis on top results)
    #[serde(default = "default_rrf_k")]
    pub rrf_k: f32,

    #[serde(default)]
    pub rerank: RerankWeights,
}

fn default_top_k() -> usize {
    10
}

fn default_min_score() -> f32 {
    0.5
}

fn default_semantic_weight() -> f32 {
    0.7
}

fn default_keyword_weight() -> f32 {
    0.3
}

fn default_rrf_k() -> f32 {
    60.0
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            default_min_score: default_min_score(),
            semantic_weight: default_semantic_weight(),
            keyword_weight: default_keyword_weight(),
            rrf_k: default_rrf_k(),
            rerank: RerankWeights::default(),
        }
    }
}

impl RetrievalConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.default_top_k == 0 {
            return Err("default_top_k must be > 0".to_string());
        }

        if !(0.0..=1.0).contains(&self.default_min_score) {
            return Err(format!(
                "default_min_score must be in [0.0, 1.0], got {}",
                self.default_min_score
            ));
        }

        if !(0.0..=1.0).contains(&self.semantic_weight) {
            return Err(format!(
                "semantic_weight must be in [0.0, 1.0], got {}",
                self.semantic_weight
            ));
        }

        if !(0.0..=1.0).contains(&self.keyword_weight) {
            return Err(format!(
                "keyword_weight must be in [0.0, 1.0], got {}",
                self.keyword_weight
            ));
        }

        let total_weight = self.semantic_weight + self.keyword_weight;
        if (total_weight - 1.0).abs() > 0.01 {
            return Err(format!(
                "semantic_weight + keyword_weight must sum to 1.0, got {total_weight}"
            ));
        }

        if self.rrf_k <= 0.0 {
            return Err(format!("rrf_k must be > 0, got {}", self.rrf_k));
        }

        Ok(())
    }

    /// `top_k` with 0 meaning the configured default
    pub fn effective_top_k(&self, top_k: usize) -> usize {
        if top_k == 0 { self.default_top_k } else { top_k }
    }

    /// `min_score` with 0 meaning the configured default
    pub fn effective_min_score(&self, min_score: f32) -> f32 {
        if min_score <= 0.0 {
            self.default_min_score
        } else {
            min_score
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_valid() {
        let config = RetrievalConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_top_k, 10);
        assert_eq!(config.default_min_score, 0.5);
    }

    #[test]
    fn test_weight_validation() {
        let mut config = RetrievalConfig {
            semantic_weight: 0.5,
            keyword_weight: 0.5,
            ..Default::default()
        };
        assert!(config.validate().is_ok());

        config.semantic_weight = 0.6;
        assert!(config.validate().is_err());

        config.semantic_weight = -0.1;
        config.keyword_weight = 1.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_request_defaults() {
        let config = RetrievalConfig::default();
        assert_eq!(config.effective_top_k(0), 10);
        assert_eq!(config.effective_top_k(3), 3);
        assert_eq!(config.effective_min_score(0.0), 0.5);
        assert_eq!(config.effective_min_score(0.2), 0.2);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: RetrievalConfig = serde_json::from_str(r#"{"rrf_k": 30.0}"#).unwrap();
        assert_eq!(config.rrf_k, 30.0);
        assert_eq!(config.semantic_weight, 0.7);
        assert_eq!(config.rerank, RerankWeights::default());
    }
}
