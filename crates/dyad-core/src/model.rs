//! Language model port.

use async_trait::async_trait;
use thiserror::Error;

/// Failure modes of a model invocation.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The provider was unreachable or returned a non-success status.
    #[error("model transport failure: {0}")]
    Transport(String),
}

/// Port for the opaque language-model collaborator.
///
/// The engine owes no retry contract: each branch makes a single
/// attempt, and a [`ModelError`] is wrapped into an `error` event
/// rather than propagated across the engine boundary.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Completes the given rendered prompt, returning raw text.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Transport`] when the provider cannot be
    /// reached or rejects the request.
    async fn complete(&self, prompt: &str) -> Result<String, ModelError>;
}
