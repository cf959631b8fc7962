//! Game configuration loading and resolution.

use std::path::{Path, PathBuf};

use dyad_core::error::SimError;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Kind of the opening-scene event a game opens with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpeningKind {
    /// Present the opening scene as system information.
    #[default]
    Info,
    /// Present the opening scene as the simulator's first turn.
    Assistant,
}

/// One keyed question on a game's completion form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormQuestion {
    /// Stable key the answer is recorded under.
    pub key: String,
    /// Question text shown to the player.
    pub prompt: String,
}

/// A game definition, loaded from a YAML document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Display name; resolution matches on it case-insensitively.
    pub name: String,
    /// Version string, compared numerically segment by segment.
    #[serde(default)]
    pub version: String,
    /// Authors, informational only.
    #[serde(default)]
    pub authors: Vec<String>,
    /// Short description shown in listings.
    #[serde(default)]
    pub description: String,
    /// Info message emitted on the `ENTER` step.
    pub welcome_message: String,
    /// Kind of the opening-scene event.
    #[serde(default)]
    pub opening: OpeningKind,
    /// Whether the game refuses players without a resolvable identity.
    #[serde(default)]
    pub requires_consent: bool,
    /// When set, the player character must be exactly this handle.
    #[serde(default)]
    pub pc_must_be: Option<String>,
    /// Character handles that may not be chosen as the NPC.
    #[serde(default)]
    pub npc_exclude: Vec<String>,
    /// PC handle used when the caller makes no choice.
    pub default_pc: String,
    /// NPC handle used when the caller makes no choice.
    pub default_npc: String,
    /// Body of the `/help` command.
    #[serde(default)]
    pub help_text: String,
    /// Whether `/guess` is available to submit a goal inference.
    #[serde(default)]
    pub goal_inference: bool,
    /// Questions presented once the session completes.
    #[serde(default)]
    pub completion_form: Vec<FormQuestion>,
    /// Per-turn budget in seconds; `None` waits for both branches.
    #[serde(default)]
    pub turn_timeout_secs: Option<u64>,
}

/// Splits a version string into numeric segments for ordering.
/// Non-numeric segments end the comparison key, so `"1.2-rc1"` orders
/// below `"1.2.0"`.
fn version_key(version: &str) -> Vec<u64> {
    version
        .split('.')
        .map_while(|segment| segment.parse::<u64>().ok())
        .collect()
}

impl GameConfig {
    /// Loads a game config from an explicit YAML path.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::GameValidation`] when the file cannot be
    /// read or parsed, or fails validation.
    pub fn from_path(path: &Path) -> Result<Self, SimError> {
        let body = std::fs::read_to_string(path)
            .map_err(|e| SimError::GameValidation(format!("reading {}: {e}", path.display())))?;
        let config: Self = serde_yaml::from_str(&body)
            .map_err(|e| SimError::GameValidation(format!("parsing {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Resolves a game by name (case-insensitive) from a directory of
    /// YAML configs, or by explicit path when `game` points at a file.
    ///
    /// When several configs share a name, the highest version wins.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::GameNotFound`] when nothing matches and
    /// [`SimError::GameValidation`] when the match fails validation.
    pub fn resolve(games_dir: &Path, game: &str) -> Result<Self, SimError> {
        let as_path = PathBuf::from(game);
        if as_path.is_file() {
            return Self::from_path(&as_path);
        }

        let entries = std::fs::read_dir(games_dir)
            .map_err(|e| SimError::GameNotFound(format!("{game} (games dir: {e})")))?;

        let mut best: Option<Self> = None;
        for entry in entries.flatten() {
            let path = entry.path();
            let is_yaml = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
            if !is_yaml {
                continue;
            }
            let candidate = match Self::from_path(&path) {
                Ok(config) => config,
                Err(error) => {
                    warn!(path = %path.display(), %error, "skipping unreadable game config");
                    continue;
                }
            };
            if !candidate.name.trim().eq_ignore_ascii_case(game.trim()) {
                continue;
            }
            let better = best
                .as_ref()
                .is_none_or(|b| version_key(&candidate.version) > version_key(&b.version));
            if better {
                best = Some(candidate);
            }
        }

        best.ok_or_else(|| SimError::GameNotFound(game.to_owned()))
    }

    /// Lists every valid game config in a directory.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Persistence`] when the directory is unreadable.
    pub fn list(games_dir: &Path) -> Result<Vec<Self>, SimError> {
        let entries = std::fs::read_dir(games_dir)
            .map_err(|e| SimError::Persistence(format!("games dir: {e}")))?;

        let mut games = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let is_yaml = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
            if !is_yaml {
                continue;
            }
            match Self::from_path(&path) {
                Ok(config) => games.push(config),
                Err(error) => warn!(path = %path.display(), %error, "skipping invalid game config"),
            }
        }
        games.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(games)
    }

    fn validate(&self) -> Result<(), SimError> {
        if self.name.trim().is_empty() {
            return Err(SimError::GameValidation("game name is empty".to_owned()));
        }
        if self.welcome_message.trim().is_empty() {
            return Err(SimError::GameValidation(format!(
                "game {:?} has no welcome_message",
                self.name
            )));
        }
        if self.npc_exclude.contains(&self.default_npc) {
            return Err(SimError::GameValidation(format!(
                "game {:?} excludes its own default NPC {:?}",
                self.name, self.default_npc
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const EXPLORE: &str = r#"
name: Explore
version: "1.0.0"
welcome_message: Welcome to Explore.
default_pc: human-normative
default_npc: flatworm
"#;

    fn write_game(dir: &Path, file: &str, body: &str) {
        fs::write(dir.join(file), body).unwrap();
    }

    #[test]
    fn test_resolve_matches_name_case_insensitively() {
        let dir = tempfile::tempdir().unwrap();
        write_game(dir.path(), "explore.yaml", EXPLORE);

        let config = GameConfig::resolve(dir.path(), "explore").unwrap();

        assert_eq!(config.name, "Explore");
        assert_eq!(config.opening, OpeningKind::Info);
    }

    #[test]
    fn test_resolve_prefers_highest_version() {
        let dir = tempfile::tempdir().unwrap();
        write_game(dir.path(), "explore-1.yaml", EXPLORE);
        write_game(
            dir.path(),
            "explore-2.yaml",
            &EXPLORE.replace("\"1.0.0\"", "\"1.10.0\""),
        );

        let config = GameConfig::resolve(dir.path(), "Explore").unwrap();

        assert_eq!(config.version, "1.10.0");
    }

    #[test]
    fn test_resolve_unknown_name_is_game_not_found() {
        let dir = tempfile::tempdir().unwrap();
        write_game(dir.path(), "explore.yaml", EXPLORE);

        let result = GameConfig::resolve(dir.path(), "Foresight");

        match result.unwrap_err() {
            SimError::GameNotFound(name) => assert_eq!(name, "Foresight"),
            other => panic!("expected GameNotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_resolve_accepts_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        write_game(dir.path(), "custom.yaml", EXPLORE);
        let path = dir.path().join("custom.yaml");

        let config = GameConfig::resolve(dir.path(), path.to_str().unwrap()).unwrap();

        assert_eq!(config.name, "Explore");
    }

    #[test]
    fn test_missing_welcome_message_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        write_game(
            dir.path(),
            "bad.yaml",
            "name: Bad\nwelcome_message: \"\"\ndefault_pc: a\ndefault_npc: b\n",
        );

        let result = GameConfig::from_path(&dir.path().join("bad.yaml"));

        assert!(matches!(result, Err(SimError::GameValidation(_))));
    }

    #[test]
    fn test_bundled_game_configs_load_and_keep_their_constraints() {
        let games_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../games");

        let games = GameConfig::list(&games_dir).unwrap();

        let names: Vec<&str> = games.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Explore", "Foresight", "Goal Horizon", "Infer Intent"]
        );

        let explore = GameConfig::resolve(&games_dir, "explore").unwrap();
        assert!(!explore.requires_consent);

        let foresight = GameConfig::resolve(&games_dir, "foresight").unwrap();
        assert!(foresight.requires_consent);
        assert_eq!(foresight.pc_must_be.as_deref(), Some("human-normative"));
        assert!(
            foresight
                .completion_form
                .iter()
                .any(|q| q.key == "additional_notes")
        );

        let horizon = GameConfig::resolve(&games_dir, "goal horizon").unwrap();
        assert!(horizon.requires_consent);
        assert!(horizon.npc_exclude.contains(&"human-normative".to_owned()));

        let infer = GameConfig::resolve(&games_dir, "infer intent").unwrap();
        assert!(infer.goal_inference);
    }

    #[test]
    fn test_version_key_orders_numerically() {
        assert!(version_key("1.10.0") > version_key("1.9.3"));
        assert!(version_key("1.2-rc1") < version_key("1.2.0"));
        assert!(version_key("") < version_key("0.1"));
    }
}
