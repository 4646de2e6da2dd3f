use crate::config::ChunkerConfig;
use crate::error::ChunkerError;
use crate::language::Language;
use crate::strategy::{
    CharTokenEstimator, SizeChunkingStrategy, SymbolChunkingStrategy, TokenEstimator,
};
use crate::{CodeChunk, SymbolInfo};
use log::debug;
use std::path::Path;
use std::sync::Arc;

/// Main code chunker
#[derive(Debug, Clone)]
pub struct Chunker {
    config: ChunkerConfig,
    estimator: Arc<dyn TokenEstimator>,
}

impl Chunker {
    /// Create a new chunker with the given configuration
    pub fn new(config: ChunkerConfig) -> Result<Self, ChunkerError> {
        Self::with_estimator(config, Arc::new(CharTokenEstimator))
    }

    /// Create a chunker that estimates tokens with a custom estimator
    pub fn with_estimator(
        config: ChunkerConfig,
        estimator: Arc<dyn TokenEstimator>,
    ) -> Result<Self, ChunkerError> {
        config.validate().map_err(ChunkerError::InvalidConfig)?;
        Ok(Self { config, estimator })
    }

    pub fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    pub fn estimator(&self) -> &dyn TokenEstimator {
        self.estimator.as_ref()
    }

    /// Split one file into chunks.
    ///
    /// With symbol boundaries the file is chunked strictly along them and
    /// the code between symbols becomes block chunks; without, lines are
    /// accumulated up to `max_chunk_tokens`.
    pub fn chunk_file(&self, file_path: &str, content: &str, symbols: &[SymbolInfo]) -> Vec<CodeChunk> {
        let language = Language::from_path(Path::new(file_path));
        let lines: Vec<&str> = content.lines().collect();

        let chunks = if symbols.is_empty() {
            SizeChunkingStrategy::new(&self.config, self.estimator.as_ref(), language)
                .chunk(&lines, file_path)
        } else {
            SymbolChunkingStrategy::new(&self.config, self.estimator.as_ref(), language)
                .chunk(&lines, file_path, symbols)
        };

        debug!(
            "Generated {} chunks for {} ({} symbols, {} language)",
            chunks.len(),
            file_path,
            symbols.len(),
            language.name()
        );
        chunks
    }
}
