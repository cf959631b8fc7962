//! Shared application state.

use std::path::PathBuf;
use std::sync::Arc;

use dyad_core::store::RunStore;
use dyad_session::{SessionDeps, SessionRegistry};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live session handles.
    pub registry: Arc<SessionRegistry>,
    /// Collaborators handed to every new session.
    pub deps: SessionDeps,
    /// Destination for run snapshots.
    pub run_store: Arc<dyn RunStore>,
    /// Directory of game config documents.
    pub games_dir: PathBuf,
}

impl AppState {
    /// Create new application state.
    #[must_use]
    pub fn new(
        registry: Arc<SessionRegistry>,
        deps: SessionDeps,
        run_store: Arc<dyn RunStore>,
        games_dir: PathBuf,
    ) -> Self {
        Self {
            registry,
            deps,
            run_store,
            games_dir,
        }
    }
}
