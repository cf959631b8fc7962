//! The uniform message unit exchanged between the engine and its callers.

use serde::{Deserialize, Serialize};

/// Tag of an [`Event`].
///
/// `Assistant` also deserializes from the legacy `"ai"` tag so that
/// transcripts written by older tooling keep loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// System information (welcome text, command output, validation notes).
    Info,
    /// A failure surfaced to the player (validation, timeout, transport).
    Error,
    /// An action taken by the player character.
    User,
    /// The simulator's in-character turn.
    #[serde(alias = "ai")]
    Assistant,
}

/// An immutable tagged message unit.
///
/// Events are produced by the turn-resolution branches, the finalize
/// reducer, or the session state machine itself; once produced they are
/// never mutated. Ordering within one turn is significant: a validation
/// error appears before (and instead of) a response event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Message tag.
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Human-readable message body.
    pub content: String,
}

impl Event {
    /// Creates an `info` event.
    #[must_use]
    pub fn info(content: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Info,
            content: content.into(),
        }
    }

    /// Creates an `error` event.
    #[must_use]
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Error,
            content: content.into(),
        }
    }

    /// Creates a `user` event.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            kind: EventKind::User,
            content: content.into(),
        }
    }

    /// Creates an `assistant` event.
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Assistant,
            content: content.into(),
        }
    }

    /// Returns `true` if this event is an error.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.kind == EventKind::Error
    }
}
