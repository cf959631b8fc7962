//! Run snapshot persistence.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use async_trait::async_trait;
use dyad_core::error::SimError;
use dyad_core::store::{RunSnapshot, RunStore};
use tracing::info;

/// A run store that writes each snapshot as pretty-printed JSON under a
/// root directory, one file per run id.
#[derive(Debug, Clone)]
pub struct FsRunStore {
    root: PathBuf,
}

impl FsRunStore {
    /// Creates a store rooted at `root`. The directory is created on
    /// first save.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl RunStore for FsRunStore {
    async fn save_run(&self, snapshot: &RunSnapshot) -> Result<String, SimError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|e| SimError::Persistence(format!("creating runs dir: {e}")))?;

        let path = self.root.join(format!("{}.json", snapshot.run_id));
        let body = serde_json::to_vec_pretty(snapshot)
            .map_err(|e| SimError::Persistence(format!("serializing run: {e}")))?;

        tokio::fs::write(&path, body)
            .await
            .map_err(|e| SimError::Persistence(format!("writing {}: {e}", path.display())))?;

        info!(run_id = %snapshot.run_id, path = %path.display(), "run saved");
        Ok(path.display().to_string())
    }
}

/// A run store that keeps the latest snapshot per run id in memory.
#[derive(Debug, Default)]
pub struct InMemoryRunStore {
    runs: RwLock<HashMap<String, RunSnapshot>>,
}

impl InMemoryRunStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the latest saved snapshot for the run, if any.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn get(&self, run_id: &str) -> Option<RunSnapshot> {
        self.runs.read().unwrap().get(run_id).cloned()
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn save_run(&self, snapshot: &RunSnapshot) -> Result<String, SimError> {
        self.runs
            .write()
            .map_err(|_| SimError::Persistence("run store lock poisoned".to_owned()))?
            .insert(snapshot.run_id.clone(), snapshot.clone());
        Ok(format!("memory://{}", snapshot.run_id))
    }
}
