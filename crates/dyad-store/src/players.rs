//! Player identity and access-key issuance.
//!
//! Raw access keys are handed out exactly once at creation; only an
//! HMAC-SHA256 digest keyed by the pepper is retained, so a leaked
//! store cannot be replayed as credentials. With no pepper configured
//! the digest degrades to plain SHA-256.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use dyad_core::error::SimError;
use dyad_core::store::{IssuedPlayer, PlayerDirectory, PlayerProfile};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};
use uuid::Uuid;

#[derive(Debug)]
struct PlayerRecord {
    profile: PlayerProfile,
    access_key_digest: String,
    revoked: bool,
}

/// An in-memory player directory with peppered access-key hashing.
#[derive(Debug)]
pub struct InMemoryPlayerDirectory {
    pepper: String,
    players: RwLock<HashMap<String, PlayerRecord>>,
}

impl InMemoryPlayerDirectory {
    /// Creates a directory using the given hash pepper.
    #[must_use]
    pub fn new(pepper: impl Into<String>) -> Self {
        Self {
            pepper: pepper.into(),
            players: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a directory peppered from `ACCESS_KEY_PEPPER` (empty if unset).
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(std::env::var("ACCESS_KEY_PEPPER").unwrap_or_default())
    }

    fn digest(&self, raw_key: &str) -> String {
        if self.pepper.is_empty() {
            return format!("{:x}", Sha256::digest(raw_key.as_bytes()));
        }
        // HMAC-SHA256 accepts keys of any length, so this never fails.
        let mut mac = Hmac::<Sha256>::new_from_slice(self.pepper.as_bytes())
            .expect("HMAC-SHA256 key setup");
        mac.update(raw_key.as_bytes());
        format!("{:x}", mac.finalize().into_bytes())
    }

    fn new_access_key() -> String {
        let mut bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut bytes);
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Returns the stored consent profile for a player, if known.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn profile(&self, player_id: &str) -> Option<PlayerProfile> {
        self.players
            .read()
            .unwrap()
            .get(player_id)
            .map(|record| record.profile.clone())
    }

    /// Revokes a player's access key. Resolution fails afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Persistence`] when the player id is unknown.
    pub fn revoke(&self, player_id: &str) -> Result<(), SimError> {
        let mut players = self
            .players
            .write()
            .map_err(|_| SimError::Persistence("player directory lock poisoned".to_owned()))?;
        match players.get_mut(player_id) {
            Some(record) => {
                record.revoked = true;
                Ok(())
            }
            None => Err(SimError::Persistence(format!(
                "unknown player: {player_id}"
            ))),
        }
    }
}

#[async_trait]
impl PlayerDirectory for InMemoryPlayerDirectory {
    async fn resolve_player_id(&self, access_key: &str) -> Result<Option<String>, SimError> {
        let digest = self.digest(access_key.trim());
        let players = self
            .players
            .read()
            .map_err(|_| SimError::Persistence("player directory lock poisoned".to_owned()))?;
        Ok(players
            .iter()
            .find(|(_, record)| !record.revoked && record.access_key_digest == digest)
            .map(|(id, _)| id.clone()))
    }

    async fn create_player(&self, profile: PlayerProfile) -> Result<IssuedPlayer, SimError> {
        let player_id = Uuid::new_v4().to_string();
        let access_key = Self::new_access_key();
        let record = PlayerRecord {
            profile,
            access_key_digest: self.digest(&access_key),
            revoked: false,
        };

        self.players
            .write()
            .map_err(|_| SimError::Persistence("player directory lock poisoned".to_owned()))?
            .insert(player_id.clone(), record);

        tracing::info!(%player_id, "issued access key for new player");

        Ok(IssuedPlayer {
            player_id,
            access_key,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_issued_key_resolves_to_player_id() {
        let directory = InMemoryPlayerDirectory::new("pepper");

        let issued = directory
            .create_player(PlayerProfile::default())
            .await
            .unwrap();
        let resolved = directory.resolve_player_id(&issued.access_key).await.unwrap();

        assert_eq!(resolved, Some(issued.player_id));
    }

    #[tokio::test]
    async fn test_unknown_key_resolves_to_none() {
        let directory = InMemoryPlayerDirectory::new("pepper");

        let resolved = directory.resolve_player_id("not-a-key").await.unwrap();

        assert_eq!(resolved, None);
    }

    #[tokio::test]
    async fn test_revoked_key_no_longer_resolves() {
        let directory = InMemoryPlayerDirectory::new("pepper");
        let issued = directory
            .create_player(PlayerProfile::default())
            .await
            .unwrap();

        directory.revoke(&issued.player_id).unwrap();
        let resolved = directory.resolve_player_id(&issued.access_key).await.unwrap();

        assert_eq!(resolved, None);
    }

    #[tokio::test]
    async fn test_key_resolution_is_pepper_sensitive() {
        let issuing = InMemoryPlayerDirectory::new("pepper-a");
        let issued = issuing.create_player(PlayerProfile::default()).await.unwrap();

        let other = InMemoryPlayerDirectory::new("pepper-b");
        // Same raw key digested under a different pepper must not match.
        let resolved = other.resolve_player_id(&issued.access_key).await.unwrap();

        assert_eq!(resolved, None);
    }

    #[tokio::test]
    async fn test_profile_is_retained_for_created_player() {
        let directory = InMemoryPlayerDirectory::new("pepper");
        let profile = PlayerProfile {
            full_name: Some("Test Player".to_owned()),
            email: Some("test@example.com".to_owned()),
            answers: serde_json::Map::new(),
        };

        let issued = directory.create_player(profile).await.unwrap();
        let stored = directory.profile(&issued.player_id).unwrap();

        assert_eq!(stored.full_name.as_deref(), Some("Test Player"));
    }

    #[test]
    fn test_digest_is_hmac_sha256_keyed_by_pepper() {
        // RFC 4231 test case 2: key "Jefe".
        let directory = InMemoryPlayerDirectory::new("Jefe");

        let digest = directory.digest("what do ya want for nothing?");

        assert_eq!(
            digest,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_digest_without_pepper_is_plain_sha256() {
        let directory = InMemoryPlayerDirectory::new("");

        let digest = directory.digest("abc");

        assert_eq!(
            digest,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_access_keys_are_128_bit_hex() {
        let key = InMemoryPlayerDirectory::new_access_key();

        assert_eq!(key.len(), 32);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
