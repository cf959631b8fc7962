//! Session lifecycle states.

use serde::{Deserialize, Serialize};

/// The session-level state machine.
///
/// Moves only forward: `ENTER -> UPDATE -> (COMPLETE | EXIT)`,
/// `COMPLETE -> EXIT`. `EXIT` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Lifecycle {
    /// Created, no turns taken yet.
    Enter,
    /// Accepting turns and commands.
    Update,
    /// Goal submitted or simulation declared complete; turns rejected.
    Complete,
    /// Terminal.
    Exit,
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Enter => "ENTER",
            Self::Update => "UPDATE",
            Self::Complete => "COMPLETE",
            Self::Exit => "EXIT",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&Lifecycle::Update).unwrap(),
            "\"UPDATE\""
        );
    }

    #[test]
    fn test_lifecycle_display_matches_serialization() {
        for state in [
            Lifecycle::Enter,
            Lifecycle::Update,
            Lifecycle::Complete,
            Lifecycle::Exit,
        ] {
            let serialized = serde_json::to_string(&state).unwrap();
            assert_eq!(serialized, format!("\"{state}\""));
        }
    }
}
