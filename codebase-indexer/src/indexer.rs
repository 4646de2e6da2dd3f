use crate::config::IndexerConfig;
use crate::discovery::discover_files;
use crate::error::{IndexerError, Result};
use crate::state::{IndexingGuard, IndexingRegistry, IndexingState};
use crate::symbols::SymbolIndex;
use crate::{normalize_root, project_id};
use coderag_code_chunker::{Chunker, CodeChunk, SymbolInfo};
use coderag_embeddings::{EmbeddingError, RetryingEmbedder};
use coderag_vector_store::{EmbeddedChunk, VectorStore, VectorStoreStats};
use log::{debug, info, warn};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Statistics about one indexing run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IndexStats {
    pub files_discovered: usize,
    /// Files in batches that were embedded and stored
    pub files_processed: usize,
    /// Files in batches that failed and were skipped
    pub files_failed: usize,
    pub chunks_stored: usize,
}

/// Text sent to the embedding model for a chunk: a one-line comment naming
/// where the code lives, followed by the code.
pub fn embedding_text(chunk: &CodeChunk) -> String {
    match chunk.symbol_name.as_deref() {
        Some(name) if !name.is_empty() => format!(
            "// {} {name} in {}\n{}",
            chunk.symbol_kind.as_deref().unwrap_or_default(),
            chunk.file_path,
            chunk.content
        ),
        _ => format!(
            "// Code from {} (lines {}-{})\n{}",
            chunk.file_path, chunk.start_line, chunk.end_line, chunk.content
        ),
    }
}

/// Walks a project, chunks its files, embeds the chunks and stores them.
pub struct SemanticIndexer {
    config: IndexerConfig,
    chunker: Chunker,
    embedder: Arc<RetryingEmbedder>,
    store: Arc<dyn VectorStore>,
    symbol_index: Option<Arc<dyn SymbolIndex>>,
    registry: Arc<IndexingRegistry>,
}

impl SemanticIndexer {
    pub fn new(
        config: IndexerConfig,
        embedder: Arc<RetryingEmbedder>,
        store: Arc<dyn VectorStore>,
    ) -> Result<Self> {
        config.validate().map_err(IndexerError::InvalidConfig)?;
        let chunker = Chunker::new(config.chunker.clone())?;

        Ok(Self {
            config,
            chunker,
            embedder,
            store,
            symbol_index: None,
            registry: Arc::new(IndexingRegistry::new()),
        })
    }

    /// Chunk along symbol boundaries from `index`.
    pub fn with_symbol_index(mut self, index: Arc<dyn SymbolIndex>) -> Self {
        self.symbol_index = Some(index);
        self
    }

    /// Share indexing states with other indexers.
    pub fn with_registry(mut self, registry: Arc<IndexingRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn config(&self) -> &IndexerConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<IndexingRegistry> {
        &self.registry
    }

    /// Index every source file under `root`.
    ///
    /// Fails fast with [`IndexerError::AlreadyInProgress`] when a run for the
    /// same project is live. A batch whose embedding or storage fails is
    /// logged and skipped; cancellation stops the run before the next batch.
    pub async fn index_project(&self, root: &Path, cancel: &CancellationToken) -> Result<IndexStats> {
        let root = normalize_root(root);
        let project_id = project_id(&root);
        let mut guard = self.registry.begin(&project_id)?;

        let result = self.run(&root, &project_id, &guard, cancel).await;
        if let Err(e) = &result {
            warn!("Indexing {} failed: {e}", root.display());
            guard.fail(e);
        }
        result
    }

    /// Run [`Self::index_project`] on a background task.
    pub fn spawn_index_project(
        self: &Arc<Self>,
        root: PathBuf,
        cancel: CancellationToken,
    ) -> JoinHandle<Result<IndexStats>> {
        let indexer = Arc::clone(self);
        tokio::spawn(async move { indexer.index_project(&root, &cancel).await })
    }

    async fn run(
        &self,
        root: &Path,
        project_id: &str,
        guard: &IndexingGuard,
        cancel: &CancellationToken,
    ) -> Result<IndexStats> {
        info!("Starting semantic indexing for {}", root.display());

        if let Some(symbol_index) = &self.symbol_index
            && let Err(e) = symbol_index.index_project(root).await
        {
            warn!("Symbol indexing failed, falling back to size-based chunks: {e}");
        }

        let files = discover_files(root, &self.config)?;
        info!("Discovered {} files", files.len());
        guard.set_total_files(files.len());

        let mut stats = IndexStats {
            files_discovered: files.len(),
            ..Default::default()
        };

        let batch_size = self.config.batch_size;
        let total_batches = files.len().div_ceil(batch_size);
        for (batch_idx, batch) in files.chunks(batch_size).enumerate() {
            if cancel.is_cancelled() {
                info!("Indexing cancelled after {batch_idx}/{total_batches} batches");
                return Err(IndexerError::Cancelled);
            }

            debug!(
                "Processing batch {}/{} ({} files)",
                batch_idx + 1,
                total_batches,
                batch.len()
            );

            match self.index_batch(root, project_id, batch, cancel).await {
                Ok(chunks) => {
                    stats.files_processed += batch.len();
                    stats.chunks_stored += chunks;
                }
                Err(IndexerError::Embedding(EmbeddingError::Cancelled)) => {
                    return Err(IndexerError::Cancelled);
                }
                Err(e) => {
                    warn!(
                        "Failed to index batch {}/{}: {e}",
                        batch_idx + 1,
                        total_batches
                    );
                    stats.files_failed += batch.len();
                }
            }

            guard.advance(batch_idx * batch_size + batch.len());
        }
        guard.advance(files.len());

        info!(
            "Indexing complete: {} files processed, {} failed, {} chunks stored",
            stats.files_processed, stats.files_failed, stats.chunks_stored
        );
        Ok(stats)
    }

    /// One embedding call and one store write for a batch of files.
    async fn index_batch(
        &self,
        root: &Path,
        project_id: &str,
        files: &[String],
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let mut chunks = Vec::new();
        for file_path in files {
            match self.chunk_file(root, file_path).await {
                Ok(file_chunks) => chunks.extend(file_chunks),
                Err(e) => warn!("Skipping {file_path}: {e}"),
            }
        }

        let texts: Vec<String> = chunks.iter().map(embedding_text).collect();
        let vectors = self.embedder.embed(&texts, cancel).await?;

        // replace whatever an earlier run stored for these files
        for file_path in files {
            self.store.delete(project_id, file_path).await?;
        }

        let embedded: Vec<EmbeddedChunk> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddedChunk::new(chunk, vector))
            .collect();
        let count = embedded.len();
        if count > 0 {
            self.store.store_batch(project_id, embedded).await?;
        }

        Ok(count)
    }

    async fn chunk_file(&self, root: &Path, file_path: &str) -> Result<Vec<CodeChunk>> {
        let content = tokio::fs::read_to_string(root.join(file_path)).await?;

        let symbols: Vec<SymbolInfo> = match &self.symbol_index {
            Some(index) => index
                .symbols_in_file(root, file_path)
                .await
                .iter()
                .map(|symbol| symbol.to_symbol_info())
                .collect(),
            None => Vec::new(),
        };

        Ok(self.chunker.chunk_file(file_path, &content, &symbols))
    }

    /// Re-index one file, replacing its previous chunks.
    ///
    /// Returns the number of chunks stored.
    pub async fn index_file(
        &self,
        root: &Path,
        file_path: &str,
        cancel: &CancellationToken,
    ) -> Result<usize> {
        let root = normalize_root(root);
        let project_id = project_id(&root);
        if cancel.is_cancelled() {
            return Err(IndexerError::Cancelled);
        }

        if let Some(symbol_index) = &self.symbol_index
            && let Err(e) = symbol_index.update_file(&root, file_path).await
        {
            warn!("Failed to refresh symbols for {file_path}: {e}");
        }

        let chunks = self.chunk_file(&root, file_path).await?;
        let texts: Vec<String> = chunks.iter().map(embedding_text).collect();
        let vectors = match self.embedder.embed(&texts, cancel).await {
            Err(EmbeddingError::Cancelled) => return Err(IndexerError::Cancelled),
            result => result?,
        };

        let removed = self.store.delete(&project_id, file_path).await?;
        let embedded: Vec<EmbeddedChunk> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| EmbeddedChunk::new(chunk, vector))
            .collect();
        let count = embedded.len();
        if count > 0 {
            self.store.store_batch(&project_id, embedded).await?;
        }

        debug!("Re-indexed {file_path}: removed {removed} chunks, stored {count}");
        Ok(count)
    }

    /// Drop every chunk of `file_path`; returns how many were removed.
    pub async fn invalidate_file(&self, root: &Path, file_path: &str) -> Result<usize> {
        let root = normalize_root(root);
        let removed = self.store.delete(&project_id(&root), file_path).await?;

        if let Some(symbol_index) = &self.symbol_index
            && let Err(e) = symbol_index.update_file(&root, file_path).await
        {
            warn!("Failed to refresh symbols for {file_path}: {e}");
        }

        info!("Invalidated {removed} chunks of {file_path}");
        Ok(removed)
    }

    /// Whether the project has at least one stored chunk.
    pub async fn is_indexed(&self, root: &Path) -> Result<bool> {
        Ok(self.get_stats(root).await?.total_chunks > 0)
    }

    pub async fn get_stats(&self, root: &Path) -> Result<VectorStoreStats> {
        Ok(self.store.get_stats(&project_id(root)).await?)
    }

    /// Progress of the current or last run for `root`.
    pub fn indexing_state(&self, root: &Path) -> Option<IndexingState> {
        self.registry.get(&project_id(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_embedding_text_names_location() {
        let chunk = CodeChunk::new("cmd/a.go", 1, 3, "func run() {}", "go", 3);
        assert_eq!(
            embedding_text(&chunk),
            "// Code from cmd/a.go (lines 1-3)\nfunc run() {}"
        );

        let chunk = chunk.with_symbol("run", "function");
        assert_eq!(
            embedding_text(&chunk),
            "// function run in cmd/a.go\nfunc run() {}"
        );

        let mut unnamed = CodeChunk::new("b.py", 4, 9, "x = 1", "python", 1);
        unnamed.symbol_name = Some(String::new());
        assert_eq!(embedding_text(&unnamed), "// Code from b.py (lines 4-9)\nx = 1");
    }
}
