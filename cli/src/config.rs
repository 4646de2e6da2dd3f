use anyhow::{Context, Result};
use coderag_codebase_context::ContextConfig;
use coderag_codebase_indexer::IndexerConfig;
use coderag_codebase_retrieval::RetrievalConfig;
use coderag_embeddings::{DEFAULT_HASHING_DIMENSIONS, OpenAiConfig, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File looked up in the project root when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "coderag.toml";

/// Snapshot location relative to the project root.
pub const DEFAULT_SNAPSHOT_PATH: &str = ".coderag/vectors.json";

pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Which embedding backend to build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// OpenAI when an API key is available, otherwise hashing
    #[default]
    Auto,
    OpenAi,
    Hashing,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default)]
    pub provider: ProviderKind,

    #[serde(flatten)]
    pub openai: OpenAiConfig,

    /// Vector length of the hashing provider
    #[serde(default = "default_hashing_dimensions")]
    pub hashing_dimensions: usize,

    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_hashing_dimensions() -> usize {
    DEFAULT_HASHING_DIMENSIONS
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::default(),
            openai: OpenAiConfig::default(),
            hashing_dimensions: default_hashing_dimensions(),
            retry: RetryPolicy::default(),
        }
    }
}

impl EmbeddingsConfig {
    /// Backend to use once the API key has been resolved.
    pub fn resolved_provider(&self) -> ProviderKind {
        match self.provider {
            ProviderKind::Auto if self.openai.api_key.is_empty() => ProviderKind::Hashing,
            ProviderKind::Auto => ProviderKind::OpenAi,
            other => other,
        }
    }
}

/// Contents of `coderag.toml`; every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Vector snapshot, relative paths resolve against the project root
    #[serde(default)]
    pub snapshot_path: Option<PathBuf>,

    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    #[serde(default)]
    pub indexer: IndexerConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub context: ContextConfig,
}

impl CliConfig {
    /// Load `path` (or `<root>/coderag.toml` when it exists), then apply
    /// environment overrides.
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file is not.
    pub fn load(root: &Path, path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = root.join(CONFIG_FILE_NAME);
                if default_path.is_file() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(key) = std::env::var(API_KEY_ENV)
            && !key.trim().is_empty()
        {
            self.embeddings.openai.api_key = key.trim().to_string();
        }
        if let Ok(base) = std::env::var("CODERAG_API_BASE") {
            self.embeddings.openai.api_base = base;
        }
        if let Ok(model) = std::env::var("CODERAG_EMBEDDING_MODEL") {
            self.embeddings.openai.model = model;
        }
    }

    fn validate(&self) -> Result<()> {
        self.indexer
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid [indexer] section: {e}"))?;
        self.retrieval
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid [retrieval] section: {e}"))?;
        self.context
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid [context] section: {e}"))?;
        self.embeddings
            .retry
            .validate()
            .map_err(|e| anyhow::anyhow!("invalid [embeddings.retry] section: {e}"))?;
        if self.embeddings.hashing_dimensions == 0 {
            anyhow::bail!("invalid [embeddings] section: hashing_dimensions must be positive");
        }
        Ok(())
    }

    /// Snapshot location for `root`, with `override_path` taking precedence.
    pub fn snapshot_path(&self, root: &Path, override_path: Option<&Path>) -> PathBuf {
        let path = override_path
            .map(Path::to_path_buf)
            .or_else(|| self.snapshot_path.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SNAPSHOT_PATH));
        if path.is_absolute() {
            path
        } else {
            root.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let temp_dir = TempDir::new().unwrap();
        let config = CliConfig::load(temp_dir.path(), None).unwrap();

        assert_eq!(config.indexer.batch_size, 10);
        assert_eq!(config.retrieval.default_top_k, 10);
        assert_eq!(config.context.context_top_k, 50);
        assert_eq!(
            config.snapshot_path(temp_dir.path(), None),
            temp_dir.path().join(DEFAULT_SNAPSHOT_PATH)
        );
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            r#"
snapshot_path = "index/vectors.json"

[embeddings]
provider = "hashing"
model = "text-embedding-3-large"
hashing_dimensions = 128

[retrieval]
default_top_k = 5

[indexer.chunker]
max_chunk_tokens = 256
min_chunk_tokens = 20
"#,
        )
        .unwrap();

        let config = CliConfig::load(temp_dir.path(), None).unwrap();

        assert_eq!(config.embeddings.provider, ProviderKind::Hashing);
        assert_eq!(config.embeddings.openai.model, "text-embedding-3-large");
        assert_eq!(config.embeddings.hashing_dimensions, 128);
        assert_eq!(config.retrieval.default_top_k, 5);
        assert_eq!(config.retrieval.default_min_score, 0.5);
        assert_eq!(config.indexer.chunker.max_chunk_tokens, 256);
        assert_eq!(
            config.snapshot_path(temp_dir.path(), None),
            temp_dir.path().join("index/vectors.json")
        );
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope.toml");
        assert!(CliConfig::load(temp_dir.path(), Some(&missing)).is_err());
    }

    #[test]
    fn test_invalid_section_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "[retrieval]\nsemantic_weight = 0.9\nkeyword_weight = 0.9\n",
        )
        .unwrap();
        assert!(CliConfig::load(temp_dir.path(), None).is_err());
    }

    #[test]
    fn test_auto_provider_resolution() {
        let mut embeddings = EmbeddingsConfig::default();
        assert_eq!(embeddings.resolved_provider(), ProviderKind::Hashing);

        embeddings.openai.api_key = "sk-test".into();
        assert_eq!(embeddings.resolved_provider(), ProviderKind::OpenAi);

        embeddings.provider = ProviderKind::Hashing;
        assert_eq!(embeddings.resolved_provider(), ProviderKind::Hashing);
    }
}
