//! Per-session worker tasks.
//!
//! Each live session is owned by exactly one tokio task that drains a
//! bounded request channel. Callers only ever hold a [`SessionHandle`],
//! so turns against one session are strictly sequential while distinct
//! sessions run fully in parallel.

use std::sync::Arc;

use dyad_core::error::SimError;
use dyad_core::event::Event;
use dyad_core::store::RunStore;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info_span, Instrument};

use crate::session::{Session, SessionMeta, SessionView};

const REQUEST_BUFFER: usize = 32;

enum SessionRequest {
    Step {
        input: String,
        reply: oneshot::Sender<Result<(Vec<Event>, SessionMeta), SimError>>,
    },
    Exit {
        reason: String,
        reply: oneshot::Sender<SessionMeta>,
    },
    Save {
        reply: oneshot::Sender<Result<String, SimError>>,
    },
    Snapshot {
        reply: oneshot::Sender<SessionView>,
    },
    Meta {
        reply: oneshot::Sender<SessionMeta>,
    },
}

/// Cloneable entry point to one session's worker.
#[derive(Clone)]
pub struct SessionHandle {
    run_id: String,
    tx: mpsc::Sender<SessionRequest>,
}

impl SessionHandle {
    /// Moves the session into a dedicated worker task and returns the
    /// handle that feeds it. The worker stops when every handle clone
    /// is dropped.
    #[must_use]
    pub fn spawn(session: Session, run_store: Arc<dyn RunStore>) -> Self {
        let run_id = session.run_id().to_owned();
        let (tx, rx) = mpsc::channel(REQUEST_BUFFER);
        let span = info_span!("session_worker", run_id = %run_id);
        tokio::spawn(run_worker(session, run_store, rx).instrument(span));
        Self { run_id, tx }
    }

    /// The run id this handle serves.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    fn gone(&self) -> SimError {
        SimError::RunNotFound(self.run_id.clone())
    }

    /// Queues one step and waits for its events and updated meta.
    ///
    /// # Errors
    ///
    /// Returns the session's own error, or [`SimError::RunNotFound`]
    /// when the worker has already stopped.
    pub async fn step(&self, input: &str) -> Result<(Vec<Event>, SessionMeta), SimError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(SessionRequest::Step {
                input: input.to_owned(),
                reply,
            })
            .await
            .map_err(|_| self.gone())?;
        response.await.map_err(|_| self.gone())?
    }

    /// Ends the run and returns the final meta.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::RunNotFound`] when the worker has stopped.
    pub async fn exit(&self, reason: &str) -> Result<SessionMeta, SimError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(SessionRequest::Exit {
                reason: reason.to_owned(),
                reply,
            })
            .await
            .map_err(|_| self.gone())?;
        response.await.map_err(|_| self.gone())
    }

    /// Persists the run and returns the snapshot location.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Persistence`] when the write fails, or
    /// [`SimError::RunNotFound`] when the worker has stopped.
    pub async fn save(&self) -> Result<String, SimError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(SessionRequest::Save { reply })
            .await
            .map_err(|_| self.gone())?;
        response.await.map_err(|_| self.gone())?
    }

    /// Reads the session without mutating it.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::RunNotFound`] when the worker has stopped.
    pub async fn snapshot(&self) -> Result<SessionView, SimError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(SessionRequest::Snapshot { reply })
            .await
            .map_err(|_| self.gone())?;
        response.await.map_err(|_| self.gone())
    }

    /// Reads the session's bookkeeping without mutating it.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::RunNotFound`] when the worker has stopped.
    pub async fn meta(&self) -> Result<SessionMeta, SimError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(SessionRequest::Meta { reply })
            .await
            .map_err(|_| self.gone())?;
        response.await.map_err(|_| self.gone())
    }
}

async fn run_worker(
    mut session: Session,
    run_store: Arc<dyn RunStore>,
    mut rx: mpsc::Receiver<SessionRequest>,
) {
    while let Some(request) = rx.recv().await {
        match request {
            SessionRequest::Step { input, reply } => {
                let outcome = session.step(&input).await;
                let response = outcome.map(|events| (events, session.meta()));
                // A caller that gave up waiting is not an error here.
                let _ = reply.send(response);
            }
            SessionRequest::Exit { reason, reply } => {
                session.exit(&reason);
                let _ = reply.send(session.meta());
            }
            SessionRequest::Save { reply } => {
                let _ = reply.send(session.save(run_store.as_ref()).await);
            }
            SessionRequest::Snapshot { reply } => {
                let _ = reply.send(session.view());
            }
            SessionRequest::Meta { reply } => {
                let _ = reply.send(session.meta());
            }
        }
    }
    debug!("session worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use dyad_core::model::LanguageModel;
    use dyad_engine::TurnResolver;
    use dyad_store::{InMemoryCharacterStore, InMemoryPlayerDirectory, InMemoryRunStore};
    use dyad_test_support::{FixedClock, ScriptedModel};

    use crate::session::{CreateRequest, SessionDeps};

    const VALID_VERDICT: &str = r#"{"events": [{"type": "user", "content": "ok"}]}"#;
    const DRAFT: &str = r#"{"event_draft": {"type": "ai", "content": "The flatworm stirs."}}"#;

    const GAME: &str = r#"
name: Explore
version: "1.0.0"
welcome_message: Welcome.
default_pc: human-normative
default_npc: flatworm
"#;

    async fn spawned_session() -> (SessionHandle, Arc<InMemoryRunStore>, tempfile::TempDir) {
        let games_dir = tempfile::tempdir().unwrap();
        std::fs::write(games_dir.path().join("explore.yaml"), GAME).unwrap();
        let model = Arc::new(ScriptedModel::new(VALID_VERDICT, DRAFT));
        let deps = SessionDeps {
            characters: Arc::new(InMemoryCharacterStore::with_seed_characters()),
            players: Arc::new(InMemoryPlayerDirectory::new("test-pepper")),
            clock: Arc::new(FixedClock(Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap())),
            resolver: Arc::new(TurnResolver::new(model as Arc<dyn LanguageModel>)),
        };
        let session = Session::create(
            CreateRequest {
                game: "explore".to_owned(),
                source: "test".to_owned(),
                ..CreateRequest::default()
            },
            games_dir.path(),
            &deps,
        )
        .await
        .unwrap();
        let store = Arc::new(InMemoryRunStore::new());
        let handle = SessionHandle::spawn(session, store.clone());
        (handle, store, games_dir)
    }

    #[tokio::test]
    async fn test_handle_steps_exits_and_saves_through_the_worker() {
        // Arrange
        let (handle, store, _games_dir) = spawned_session().await;

        // Act
        let (_, meta) = handle.step("").await.unwrap();
        assert_eq!(meta.turns, 1);
        let (_, meta) = handle.step("I wave my hand").await.unwrap();
        assert_eq!(meta.turns, 2);

        handle.save().await.unwrap();
        let meta = handle.exit("done").await.unwrap();

        // Assert
        assert!(meta.exited);
        assert!(store.get(handle.run_id()).is_some());
    }

    #[tokio::test]
    async fn test_concurrent_steps_on_one_handle_are_serialized() {
        let (handle, _store, _games_dir) = spawned_session().await;
        handle.step("").await.unwrap();

        let a = handle.clone();
        let b = handle.clone();
        let (ra, rb) = tokio::join!(a.step("I wave my hand"), b.step("I crouch down"));

        // Both turns land; the single consumer keeps the pair count
        // consistent no matter the interleaving.
        ra.unwrap();
        let (_, meta) = rb.unwrap();
        let view = handle.snapshot().await.unwrap();
        assert_eq!(view.history.len(), 6);
        assert_eq!(meta.turns.max(view.turns), 3);
    }

    #[tokio::test]
    async fn test_stopped_worker_surfaces_run_not_found() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let handle = SessionHandle {
            run_id: "explore-test-20260301090000-ab12".to_owned(),
            tx,
        };

        let result = handle.step("I wave my hand").await;

        match result.unwrap_err() {
            SimError::RunNotFound(id) => assert_eq!(id, handle.run_id()),
            other => panic!("expected RunNotFound, got {other:?}"),
        }
    }
}
