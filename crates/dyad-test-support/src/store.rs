//! Test run stores — recording and failing `RunStore` implementations.

use std::sync::Mutex;

use async_trait::async_trait;
use dyad_core::error::SimError;
use dyad_core::store::{RunSnapshot, RunStore};

/// A run store that records every saved snapshot and reports a
/// `memory://` location.
#[derive(Debug, Default)]
pub struct RecordingRunStore {
    saved: Mutex<Vec<RunSnapshot>>,
}

impl RecordingRunStore {
    /// Creates an empty recording store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of everything saved so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn saved_runs(&self) -> Vec<RunSnapshot> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl RunStore for RecordingRunStore {
    async fn save_run(&self, snapshot: &RunSnapshot) -> Result<String, SimError> {
        let location = format!("memory://{}", snapshot.run_id);
        self.saved.lock().unwrap().push(snapshot.clone());
        Ok(location)
    }
}

/// A run store whose every save fails.
#[derive(Debug)]
pub struct FailingRunStore;

#[async_trait]
impl RunStore for FailingRunStore {
    async fn save_run(&self, _snapshot: &RunSnapshot) -> Result<String, SimError> {
        Err(SimError::Persistence("run store unavailable".to_owned()))
    }
}
