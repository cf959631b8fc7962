//! Character sheet storage.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use dyad_core::character::CharacterSheet;
use dyad_core::error::SimError;
use dyad_core::store::CharacterStore;

/// Bundled character sheets seeded into every default store.
const SEED_SHEETS: [&str; 2] = [
    include_str!("../seeds/human-normative.yaml"),
    include_str!("../seeds/flatworm.yaml"),
];

/// An in-memory character store keyed by stable handle.
#[derive(Debug, Default)]
pub struct InMemoryCharacterStore {
    sheets: RwLock<HashMap<String, CharacterSheet>>,
}

impl InMemoryCharacterStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with the bundled character sheets.
    ///
    /// # Panics
    ///
    /// Panics if a bundled seed fails to parse; the seeds ship with the
    /// crate and are covered by tests.
    #[must_use]
    pub fn with_seed_characters() -> Self {
        let store = Self::new();
        for doc in SEED_SHEETS {
            let sheet: CharacterSheet =
                serde_yaml::from_str(doc).expect("bundled character seed must parse");
            store.insert(sheet);
        }
        store
    }

    /// Inserts or replaces a sheet.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn insert(&self, sheet: CharacterSheet) {
        self.sheets.write().unwrap().insert(sheet.hid.clone(), sheet);
    }
}

#[async_trait]
impl CharacterStore for InMemoryCharacterStore {
    async fn find_by_hid(&self, hid: &str) -> Result<CharacterSheet, SimError> {
        self.sheets
            .read()
            .map_err(|_| SimError::Persistence("character store lock poisoned".to_owned()))?
            .get(hid)
            .cloned()
            .ok_or_else(|| SimError::CharacterNotFound(hid.to_owned()))
    }

    async fn list(&self) -> Result<Vec<CharacterSheet>, SimError> {
        let sheets = self
            .sheets
            .read()
            .map_err(|_| SimError::Persistence("character store lock poisoned".to_owned()))?;
        let mut all: Vec<CharacterSheet> = sheets.values().cloned().collect();
        all.sort_by(|a, b| a.hid.cmp(&b.hid));
        Ok(all)
    }
}
