//! Domain error types.

use thiserror::Error;

/// Top-level domain error type.
///
/// Content-level problems inside a turn (validation failures, malformed
/// model output, model transport failures) are never represented here;
/// the engine turns those into `error` events. `SimError` covers the
/// failures that the session layer and its callers must handle.
#[derive(Debug, Error)]
pub enum SimError {
    /// A character sheet was not found.
    #[error("character not found: {0}")]
    CharacterNotFound(String),

    /// A run id is not live in the registry.
    #[error("run not found: {0}")]
    RunNotFound(String),

    /// No game config matches the requested name.
    #[error("game not found: {0}")]
    GameNotFound(String),

    /// Identity could not be established for a gated game.
    #[error("authorization failed: {0}")]
    Authorization(String),

    /// A game config failed validation or a character choice violates
    /// the game's constraints.
    #[error("game validation failed: {0}")]
    GameValidation(String),

    /// A lifecycle operation was attempted from a state that forbids it.
    /// This indicates a bug in the calling layer, not user input.
    #[error("invalid lifecycle transition: {0}")]
    InvalidLifecycleTransition(String),

    /// A persistence operation failed. Surfaced, never retried here.
    #[error("persistence error: {0}")]
    Persistence(String),
}
