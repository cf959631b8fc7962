//! The live-run registry.

use std::collections::HashMap;
use std::sync::RwLock;

use dyad_core::error::SimError;

use crate::worker::SessionHandle;

/// Live session handles keyed by run id.
///
/// Non-persistent and process-local; this is the single source of truth
/// for "is this run id live". Constructed once at startup and threaded
/// through to whoever needs it. The coarse lock is fine here: entries
/// are small handle clones and every critical section is a map touch.
#[derive(Default)]
pub struct SessionRegistry {
    handles: RwLock<HashMap<String, SessionHandle>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handle under its run id. Replaces any stale entry
    /// with the same id.
    pub fn add(&self, handle: SessionHandle) {
        let mut handles = self.handles.write().expect("registry lock poisoned");
        handles.insert(handle.run_id().to_owned(), handle);
    }

    /// Looks up a live run.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::RunNotFound`] when the id is not live.
    pub fn get(&self, run_id: &str) -> Result<SessionHandle, SimError> {
        let handles = self.handles.read().expect("registry lock poisoned");
        handles
            .get(run_id)
            .cloned()
            .ok_or_else(|| SimError::RunNotFound(run_id.to_owned()))
    }

    /// Removes a run, returning its handle so the caller can finish
    /// with it. The worker stops once the last clone drops.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::RunNotFound`] when the id is not live.
    pub fn remove(&self, run_id: &str) -> Result<SessionHandle, SimError> {
        let mut handles = self.handles.write().expect("registry lock poisoned");
        handles
            .remove(run_id)
            .ok_or_else(|| SimError::RunNotFound(run_id.to_owned()))
    }

    /// All live run ids, sorted.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        let handles = self.handles.read().expect("registry lock poisoned");
        let mut ids: Vec<String> = handles.keys().cloned().collect();
        ids.sort();
        ids
    }
}
