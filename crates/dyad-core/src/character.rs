//! Character sheets.

use serde::{Deserialize, Serialize};

/// A character sheet, immutable once bound to a session.
///
/// Abilities are free-form capability tags (e.g. `"sight"`, `"hearing"`,
/// `"speech"`) that bound what the validator and the scene-advancer may
/// assume perceivable for this character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterSheet {
    /// Stable handle used to reference this character.
    pub hid: String,
    /// Display name.
    pub name: String,
    /// Archetype grouping (used by game-level character constraints).
    pub archetype: String,
    /// One-line description.
    pub short_description: String,
    /// Full description fed to the scene-advancer.
    #[serde(default)]
    pub long_description: String,
    /// Capability tags.
    #[serde(default)]
    pub abilities: Vec<String>,
}

impl CharacterSheet {
    /// Returns `true` if the sheet carries the given capability tag.
    #[must_use]
    pub fn has_ability(&self, tag: &str) -> bool {
        self.abilities.iter().any(|a| a == tag)
    }
}
