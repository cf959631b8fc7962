//! Per-turn state and the finalize reducer.

use dyad_core::event::Event;

/// Ephemeral state scoped to exactly one `resolve` call.
///
/// Created fresh per turn and discarded when the turn completes;
/// nothing in it persists except what the caller copies into session
/// history. `final_message` is set if and only if the turn completed,
/// normally or via early-stop synthesis.
#[derive(Debug, Clone, Default)]
pub struct TurnState {
    /// The raw player input for this turn.
    pub user_input: String,
    /// Outcome of the validation branch, once it has finished.
    pub validation_message: Option<Event>,
    /// Outcome of the draft branch, once it has finished.
    pub response_message: Option<Event>,
    /// The single reconciled outcome of the turn.
    pub final_message: Option<Event>,
}

impl TurnState {
    /// Creates turn state for the given input.
    #[must_use]
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            ..Self::default()
        }
    }
}

/// Reconciles whichever branch outcomes are present into the final event.
///
/// Rules, in order:
/// 1. a validation error always wins, even if the draft finished first;
/// 2. validation passed and a response exists: the response wins;
/// 3. no validation outcome at all: a synthesized error;
/// 4. validation passed but no response: a synthesized error. This last
///    branch should be unreachable when both branches are awaited, and
///    is kept as a defensive fallback.
#[must_use]
pub fn finalize(state: &TurnState) -> Event {
    let Some(validation) = &state.validation_message else {
        return Event::error("Validation did not run or produced no result.");
    };

    if validation.is_error() {
        return validation.clone();
    }

    match &state.response_message {
        Some(response) => response.clone(),
        None => Event::error("Validation passed, but no response was generated."),
    }
}
