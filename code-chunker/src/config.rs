use serde::{Deserialize, Serialize};

/// Configuration for code chunking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Maximum chunk size in estimated tokens for size-based chunking
    #[serde(default = "default_max_chunk_tokens")]
    pub max_chunk_tokens: usize,

    /// Chunks estimated below this are discarded
    #[serde(default = "default_min_chunk_tokens")]
    pub min_chunk_tokens: usize,

    /// Trailing tokens of a size-based chunk repeated at the start of the next
    #[serde(default = "default_overlap_tokens")]
    pub overlap_tokens: usize,
}

fn default_max_chunk_tokens() -> usize {
    512
}

fn default_min_chunk_tokens() -> usize {
    20
}

fn default_overlap_tokens() -> usize {
    50
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_tokens: default_max_chunk_tokens(),
            min_chunk_tokens: default_min_chunk_tokens(),
            overlap_tokens: default_overlap_tokens(),
        }
    }
}

impl ChunkerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_chunk_tokens == 0 {
            return Err("max_chunk_tokens must be greater than 0".into());
        }

        if self.min_chunk_tokens > self.max_chunk_tokens {
            return Err("min_chunk_tokens must not exceed max_chunk_tokens".into());
        }

        if self.overlap_tokens >= self.max_chunk_tokens {
            return Err("overlap_tokens must be smaller than max_chunk_tokens".into());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_is_valid() {
        let config = ChunkerConfig::default();
        assert_eq!(config.max_chunk_tokens, 512);
        assert_eq!(config.min_chunk_tokens, 20);
        assert_eq!(config.overlap_tokens, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let config = ChunkerConfig {
            max_chunk_tokens: 100,
            min_chunk_tokens: 500,
            overlap_tokens: 0,
        };
        assert!(config.validate().is_err());

        let config = ChunkerConfig {
            max_chunk_tokens: 100,
            min_chunk_tokens: 10,
            overlap_tokens: 100,
        };
        assert!(config.validate().is_err());
    }
}
