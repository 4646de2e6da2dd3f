use crate::chunk::{EmbeddedChunk, ScoredChunk, VectorStoreStats, cosine_similarity};
use crate::error::VectorStoreError;
use async_trait::async_trait;
use log::{debug, info};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Storage for embedded chunks, partitioned by project id.
///
/// Writes are keyed by chunk id, so storing the same chunk twice overwrites
/// instead of duplicating.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn store_batch(
        &self,
        project_id: &str,
        chunks: Vec<EmbeddedChunk>,
    ) -> Result<(), VectorStoreError>;

    /// Up to `top_k` chunks with similarity `>= min_score`, best first.
    async fn search(
        &self,
        project_id: &str,
        query: &[f32],
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredChunk>, VectorStoreError>;

    /// Remove every chunk of `file_path`; returns how many were removed.
    async fn delete(&self, project_id: &str, file_path: &str) -> Result<usize, VectorStoreError>;

    async fn delete_project(&self, project_id: &str) -> Result<(), VectorStoreError>;

    async fn get_stats(&self, project_id: &str) -> Result<VectorStoreStats, VectorStoreError>;
}

type ProjectChunks = HashMap<String, EmbeddedChunk>;

/// In-memory cosine-similarity store with an optional JSON snapshot on disk.
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    snapshot_path: Option<PathBuf>,
    projects: RwLock<HashMap<String, ProjectChunks>>,
}

impl InMemoryVectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a store backed by `path`, loading the snapshot if one exists.
    pub async fn open(path: &Path) -> Result<Self, VectorStoreError> {
        info!("Opening vector store snapshot at {}", path.display());

        let projects = if tokio::fs::try_exists(path).await? {
            Self::load_snapshot(path).await?
        } else {
            HashMap::new()
        };

        Ok(Self {
            snapshot_path: Some(path.to_path_buf()),
            projects: RwLock::new(projects),
        })
    }

    async fn load_snapshot(path: &Path) -> Result<HashMap<String, ProjectChunks>, VectorStoreError> {
        let content = tokio::fs::read(path).await?;
        let projects: HashMap<String, Vec<EmbeddedChunk>> = serde_json::from_slice(&content)?;

        let projects = projects
            .into_iter()
            .map(|(project_id, chunks)| {
                let chunks = chunks
                    .into_iter()
                    .map(|c| (c.chunk.id.clone(), c))
                    .collect();
                (project_id, chunks)
            })
            .collect();
        Ok(projects)
    }

    /// Write the snapshot, if this store was opened from a path.
    pub async fn save(&self) -> Result<(), VectorStoreError> {
        let Some(path) = &self.snapshot_path else {
            return Ok(());
        };

        let content = {
            let projects = self.projects.read().await;
            let flat: HashMap<&String, Vec<&EmbeddedChunk>> = projects
                .iter()
                .map(|(project_id, chunks)| (project_id, chunks.values().collect()))
                .collect();
            serde_json::to_vec(&flat)?
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content).await?;
        debug!("Saved vector store snapshot to {}", path.display());
        Ok(())
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn store_batch(
        &self,
        project_id: &str,
        chunks: Vec<EmbeddedChunk>,
    ) -> Result<(), VectorStoreError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let mut projects = self.projects.write().await;
        let project = projects.entry(project_id.to_string()).or_default();

        let expected = project
            .values()
            .next()
            .map(|c| c.embedding.len())
            .or_else(|| chunks.first().map(|c| c.embedding.len()))
            .unwrap_or_default();
        if let Some(bad) = chunks.iter().find(|c| c.embedding.len() != expected) {
            return Err(VectorStoreError::DimensionMismatch {
                expected,
                actual: bad.embedding.len(),
            });
        }

        let count = chunks.len();
        for mut incoming in chunks {
            if let Some(existing) = project.get(&incoming.chunk.id) {
                incoming.created_at = existing.created_at;
            }
            project.insert(incoming.chunk.id.clone(), incoming);
        }

        debug!("Stored {count} chunks for project {project_id}");
        Ok(())
    }

    async fn search(
        &self,
        project_id: &str,
        query: &[f32],
        top_k: usize,
        min_score: f32,
    ) -> Result<Vec<ScoredChunk>, VectorStoreError> {
        if query.is_empty() {
            return Err(VectorStoreError::InvalidQuery("empty query vector".into()));
        }

        let projects = self.projects.read().await;
        let Some(project) = projects.get(project_id) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<(&EmbeddedChunk, f32)> = project
            .values()
            .filter(|stored| stored.embedding.len() == query.len())
            .map(|stored| (stored, cosine_similarity(query, &stored.embedding)))
            .filter(|(_, score)| *score >= min_score)
            .collect();

        scored.sort_by(|(a, score_a), (b, score_b)| {
            score_b
                .total_cmp(score_a)
                .then_with(|| a.chunk.file_path.cmp(&b.chunk.file_path))
                .then_with(|| a.chunk.start_line.cmp(&b.chunk.start_line))
        });

        Ok(scored
            .into_iter()
            .take(top_k)
            .map(|(stored, score)| ScoredChunk {
                chunk: stored.chunk.clone(),
                score,
            })
            .collect())
    }

    async fn delete(&self, project_id: &str, file_path: &str) -> Result<usize, VectorStoreError> {
        let mut projects = self.projects.write().await;
        let Some(project) = projects.get_mut(project_id) else {
            return Ok(0);
        };

        let before = project.len();
        project.retain(|_, stored| stored.chunk.file_path != file_path);
        let removed = before - project.len();

        debug!("Deleted {removed} chunks of {file_path} from project {project_id}");
        Ok(removed)
    }

    async fn delete_project(&self, project_id: &str) -> Result<(), VectorStoreError> {
        self.projects.write().await.remove(project_id);
        Ok(())
    }

    async fn get_stats(&self, project_id: &str) -> Result<VectorStoreStats, VectorStoreError> {
        let projects = self.projects.read().await;
        let Some(project) = projects.get(project_id) else {
            return Ok(VectorStoreStats::default());
        };

        let files: HashSet<&str> = project
            .values()
            .map(|stored| stored.chunk.file_path.as_str())
            .collect();

        Ok(VectorStoreStats {
            total_chunks: project.len(),
            total_files: files.len(),
            total_tokens: project.values().map(|s| s.chunk.token_count).sum(),
            dimensions: project.values().next().map(|s| s.embedding.len()),
            last_updated: project.values().map(|s| s.updated_at).max(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coderag_code_chunker::CodeChunk;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn embedded(path: &str, start: usize, embedding: Vec<f32>) -> EmbeddedChunk {
        let chunk = CodeChunk::new(path, start, start + 9, format!("// {path}:{start}"), "rust", 30);
        EmbeddedChunk::new(chunk, embedding)
    }

    #[tokio::test]
    async fn test_store_and_search() {
        let store = InMemoryVectorStore::new();
        store
            .store_batch(
                "p1",
                vec![
                    embedded("a.rs", 1, vec![1.0, 0.0]),
                    embedded("b.rs", 1, vec![0.7, 0.7]),
                    embedded("c.rs", 1, vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let results = store.search("p1", &[1.0, 0.0], 10, 0.5).await.unwrap();
        let paths: Vec<_> = results.iter().map(|r| r.chunk.file_path.as_str()).collect();
        assert_eq!(paths, vec!["a.rs", "b.rs"]);
        assert!(results[0].score > results[1].score);

        let limited = store.search("p1", &[1.0, 0.0], 1, 0.0).await.unwrap();
        assert_eq!(limited.len(), 1);

        assert!(store.search("other", &[1.0, 0.0], 10, 0.0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_restore_overwrites_by_id() {
        let store = InMemoryVectorStore::new();
        store
            .store_batch("p1", vec![embedded("a.rs", 1, vec![1.0, 0.0])])
            .await
            .unwrap();
        store
            .store_batch("p1", vec![embedded("a.rs", 1, vec![0.0, 1.0])])
            .await
            .unwrap();

        let stats = store.get_stats("p1").await.unwrap();
        assert_eq!(stats.total_chunks, 1);
        assert_eq!(stats.dimensions, Some(2));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_rejected() {
        let store = InMemoryVectorStore::new();
        store
            .store_batch("p1", vec![embedded("a.rs", 1, vec![1.0, 0.0])])
            .await
            .unwrap();

        let err = store
            .store_batch("p1", vec![embedded("b.rs", 1, vec![1.0, 0.0, 0.0])])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::DimensionMismatch { expected: 2, actual: 3 }
        ));
    }

    #[tokio::test]
    async fn test_delete_file_and_stats() {
        let store = InMemoryVectorStore::new();
        store
            .store_batch(
                "p1",
                vec![
                    embedded("a.rs", 1, vec![1.0, 0.0]),
                    embedded("a.rs", 11, vec![1.0, 0.1]),
                    embedded("b.rs", 1, vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let stats = store.get_stats("p1").await.unwrap();
        assert_eq!(stats.total_chunks, 3);
        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.total_tokens, 90);
        assert!(stats.last_updated.is_some());

        assert_eq!(store.delete("p1", "a.rs").await.unwrap(), 2);
        assert_eq!(store.get_stats("p1").await.unwrap().total_files, 1);

        store.delete_project("p1").await.unwrap();
        assert_eq!(store.get_stats("p1").await.unwrap(), VectorStoreStats::default());
    }

    #[tokio::test]
    async fn test_snapshot_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("index").join("vectors.json");

        let store = InMemoryVectorStore::open(&path).await.unwrap();
        store
            .store_batch("p1", vec![embedded("a.rs", 1, vec![1.0, 0.0])])
            .await
            .unwrap();
        store.save().await.unwrap();

        let reopened = InMemoryVectorStore::open(&path).await.unwrap();
        let results = reopened.search("p1", &[1.0, 0.0], 5, 0.9).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.file_path, "a.rs");
    }
}
