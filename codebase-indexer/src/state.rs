use crate::error::{IndexerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::SystemTime;

/// Progress of one project's indexing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexingState {
    pub project_id: String,

    pub in_progress: bool,

    /// Fraction of discovered files processed, in `[0, 1]`
    pub progress: f64,

    pub total_files: usize,

    pub indexed_files: usize,

    pub started_at: SystemTime,

    /// Terminal error of the last run, if it failed
    pub error: Option<String>,
}

impl IndexingState {
    fn started(project_id: &str) -> Self {
        Self {
            project_id: project_id.to_string(),
            in_progress: true,
            progress: 0.0,
            total_files: 0,
            indexed_files: 0,
            started_at: SystemTime::now(),
            error: None,
        }
    }
}

/// Per-project indexing states.
///
/// Status reads take the lock shared; only state transitions take it
/// exclusively, and it is never held across an await point.
#[derive(Debug, Default)]
pub struct IndexingRegistry {
    states: RwLock<HashMap<String, IndexingState>>,
}

impl IndexingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a project's state
    pub fn get(&self, project_id: &str) -> Option<IndexingState> {
        self.states
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(project_id)
            .cloned()
    }

    pub fn is_in_progress(&self, project_id: &str) -> bool {
        self.get(project_id).is_some_and(|s| s.in_progress)
    }

    /// Start a run for `project_id`, rejecting it if one is already live.
    ///
    /// The returned guard retires the state when dropped.
    pub fn begin(self: &Arc<Self>, project_id: &str) -> Result<IndexingGuard> {
        let mut states = self.states.write().unwrap_or_else(PoisonError::into_inner);
        if states.get(project_id).is_some_and(|s| s.in_progress) {
            return Err(IndexerError::AlreadyInProgress(project_id.to_string()));
        }
        states.insert(project_id.to_string(), IndexingState::started(project_id));

        Ok(IndexingGuard {
            registry: Arc::clone(self),
            project_id: project_id.to_string(),
            error: None,
        })
    }

    fn update(&self, project_id: &str, f: impl FnOnce(&mut IndexingState)) {
        let mut states = self.states.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(state) = states.get_mut(project_id) {
            f(state);
        }
    }
}

/// Handle on a live indexing run.
#[derive(Debug)]
pub struct IndexingGuard {
    registry: Arc<IndexingRegistry>,
    project_id: String,
    error: Option<String>,
}

impl IndexingGuard {
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn set_total_files(&self, total: usize) {
        self.registry.update(&self.project_id, |state| {
            state.total_files = total;
        });
    }

    /// Record that the first `indexed` files are done.
    pub fn advance(&self, indexed: usize) {
        self.registry.update(&self.project_id, |state| {
            state.indexed_files = indexed;
            state.progress = if state.total_files == 0 {
                1.0
            } else {
                indexed as f64 / state.total_files as f64
            };
        });
    }

    /// Mark the run as failed; recorded when the guard is dropped.
    pub fn fail(&mut self, error: &IndexerError) {
        self.error = Some(error.to_string());
    }
}

impl Drop for IndexingGuard {
    fn drop(&mut self) {
        let error = self.error.take();
        self.registry.update(&self.project_id, |state| {
            state.in_progress = false;
            state.error = error;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_concurrent_begin_is_rejected() {
        let registry = Arc::new(IndexingRegistry::new());
        let guard = registry.begin("p1").unwrap();

        assert!(matches!(
            registry.begin("p1"),
            Err(IndexerError::AlreadyInProgress(id)) if id == "p1"
        ));
        // other projects are independent
        let other = registry.begin("p2").unwrap();

        drop(guard);
        drop(other);
        assert!(registry.begin("p1").is_ok());
    }

    #[test]
    fn test_progress_and_retire() {
        let registry = Arc::new(IndexingRegistry::new());
        let guard = registry.begin("p1").unwrap();
        guard.set_total_files(4);
        guard.advance(1);

        let state = registry.get("p1").unwrap();
        assert!(state.in_progress);
        assert_eq!(state.indexed_files, 1);
        assert_eq!(state.progress, 0.25);

        drop(guard);
        let state = registry.get("p1").unwrap();
        assert!(!state.in_progress);
        assert_eq!(state.error, None);
    }

    #[test]
    fn test_failure_is_recorded() {
        let registry = Arc::new(IndexingRegistry::new());
        let mut guard = registry.begin("p1").unwrap();
        guard.fail(&IndexerError::Cancelled);
        drop(guard);

        let state = registry.get("p1").unwrap();
        assert!(!state.in_progress);
        assert_eq!(state.error.as_deref(), Some("Indexing cancelled"));
        assert!(!registry.is_in_progress("p1"));
    }
}
