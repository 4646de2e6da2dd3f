use coderag_code_chunker::ChunkerConfig;
use serde::{Deserialize, Serialize};

/// Configuration for codebase indexing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// Chunker configuration
    #[serde(default)]
    pub chunker: ChunkerConfig,

    /// Files per embedding call
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Directory names never descended into (dot-directories are always skipped)
    #[serde(default = "default_skip_dirs")]
    pub skip_dirs: Vec<String>,
}

fn default_batch_size() -> usize {
    10
}

fn default_skip_dirs() -> Vec<String> {
    [
        ".git",
        ".svn",
        ".hg",
        "node_modules",
        "vendor",
        "venv",
        ".venv",
        "build",
        "dist",
        "target",
        "out",
        ".idea",
        ".vscode",
        ".vs",
        "__pycache__",
        ".pytest_cache",
        "coverage",
        ".nyc_output",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            chunker: ChunkerConfig::default(),
            batch_size: default_batch_size(),
            skip_dirs: default_skip_dirs(),
        }
    }
}

impl IndexerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("Batch size must be > 0".to_string());
        }

        self.chunker.validate()?;

        Ok(())
    }

    /// Whether a directory with this name is skipped during discovery
    pub fn skips_dir(&self, name: &str) -> bool {
        name.starts_with('.') || self.skip_dirs.iter().any(|d| d == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = IndexerConfig::default();
        assert_eq!(config.batch_size, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = IndexerConfig::default();
        config.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_skips_dir() {
        let config = IndexerConfig::default();
        assert!(config.skips_dir("node_modules"));
        assert!(config.skips_dir(".cache"));
        assert!(config.skips_dir("target"));
        assert!(!config.skips_dir("src"));
    }
}
