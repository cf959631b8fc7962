//! Persistence and identity ports.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::character::CharacterSheet;
use crate::error::SimError;
use crate::event::Event;

/// Flat snapshot of a finished (or in-flight) run, as persisted by a
/// [`RunStore`]. This is the only thing that survives the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSnapshot {
    /// Stable run identifier.
    pub run_id: String,
    /// Name of the game this run was created from.
    pub game_name: String,
    /// Lifecycle state at snapshot time (`ENTER`, `UPDATE`, `COMPLETE`, `EXIT`).
    pub lifecycle: String,
    /// Full conversation history.
    pub history: Vec<Event>,
    /// Completed turn count.
    pub turns: usize,
    /// Player character handle.
    pub pc_hid: String,
    /// Non-player character handle.
    pub npc_hid: String,
    /// Resolved player identity, if any.
    pub player_id: Option<String>,
    /// Whether the run has exited.
    pub exited: bool,
    /// Exit reason recorded by the first `exit` call.
    pub exit_reason: String,
    /// When the run was created.
    pub started_at: DateTime<Utc>,
    /// When the run exited, if it has.
    pub ended_at: Option<DateTime<Utc>>,
}

/// Consent-form profile supplied when creating a player.
///
/// Free-form answers are kept as JSON so game-specific consent forms
/// can evolve without schema changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerProfile {
    /// Player's display name, if given.
    #[serde(default)]
    pub full_name: Option<String>,
    /// Contact email, if given.
    #[serde(default)]
    pub email: Option<String>,
    /// Remaining consent-form answers keyed by question.
    #[serde(default)]
    pub answers: serde_json::Map<String, serde_json::Value>,
}

/// A freshly created player identity with its one-time access key.
///
/// The raw key is returned exactly once; only its digest is stored.
#[derive(Debug, Clone)]
pub struct IssuedPlayer {
    /// The new player's identifier.
    pub player_id: String,
    /// The raw access key to hand to the player.
    pub access_key: String,
}

/// Read access to character sheets.
#[async_trait]
pub trait CharacterStore: Send + Sync {
    /// Looks up a character sheet by its stable handle.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::CharacterNotFound`] when no sheet matches.
    async fn find_by_hid(&self, hid: &str) -> Result<CharacterSheet, SimError>;

    /// Lists all known character sheets.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Persistence`] on store failure.
    async fn list(&self) -> Result<Vec<CharacterSheet>, SimError>;
}

/// Player identity and access-key resolution.
#[async_trait]
pub trait PlayerDirectory: Send + Sync {
    /// Resolves a raw access key to a player id.
    ///
    /// Returns `Ok(None)` for unknown or revoked keys; the caller
    /// decides whether that is fatal.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Persistence`] on store failure.
    async fn resolve_player_id(&self, access_key: &str) -> Result<Option<String>, SimError>;

    /// Creates a player from a consent profile and issues an access key.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Persistence`] on store failure.
    async fn create_player(&self, profile: PlayerProfile) -> Result<IssuedPlayer, SimError>;
}

/// Write access for run snapshots.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Persists the snapshot, returning the location it was written to.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Persistence`] when the write fails.
    async fn save_run(&self, snapshot: &RunSnapshot) -> Result<String, SimError>;
}
