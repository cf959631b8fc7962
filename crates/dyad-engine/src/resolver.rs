//! The streaming controller around the validate/draft fan-out.

use std::future;
use std::sync::Arc;
use std::time::Duration;

use dyad_core::character::CharacterSheet;
use dyad_core::event::Event;
use dyad_core::model::LanguageModel;
use dyad_prompts::{PromptContext, render_responder, render_validator};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::state::{TurnState, finalize};
use crate::verdict::{response_event_from, validation_event_from};

/// Longest accepted player input, in characters.
pub const MAX_INPUT_CHARS: usize = 2000;

/// Session context the engine needs for one turn.
#[derive(Debug, Clone, Copy)]
pub struct TurnContext<'a> {
    /// The player character's sheet.
    pub pc: &'a CharacterSheet,
    /// The simulator character's sheet.
    pub npc: &'a CharacterSheet,
    /// Conversation history so far; empty on the opening turn.
    pub history: &'a [Event],
    /// The validator's reason for rejecting the previous attempt, if any.
    pub invalid_reason: Option<&'a str>,
}

/// Caller-supplied limits on one turn.
#[derive(Debug, Clone, Default)]
pub struct TurnOptions {
    /// Budget for the whole turn; `None` means wait for both branches.
    pub timeout: Option<Duration>,
    /// External cancellation signal (e.g. a UI stop button).
    pub cancel: Option<CancellationToken>,
}

/// The ordered, observable outcome of one turn.
///
/// `events` lists validation-relevant events before the response and
/// ends with the single terminal event; `final_message` is that
/// terminal event, the only thing a caller may append to history.
#[derive(Debug, Clone)]
pub struct TurnResolution {
    /// Events in the order a caller should observe them.
    pub events: Vec<Event>,
    /// The single reconciled outcome of the turn.
    pub final_message: Event,
}

/// The turn-resolution engine.
///
/// Fans one player action out to a validation branch and a draft
/// branch, then reconciles whichever outcomes arrive into exactly one
/// final event. The fixed two-branch/one-join topology is wired
/// directly; there is no general task graph underneath.
pub struct TurnResolver {
    model: Arc<dyn LanguageModel>,
}

impl TurnResolver {
    /// Creates a resolver over the given model.
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Checks the rules that need no model call.
    fn local_validation(input: &str) -> Option<Event> {
        if input.trim().is_empty() {
            return Some(Event::error("Validation failed: Input is empty."));
        }
        if input.chars().count() > MAX_INPUT_CHARS {
            return Some(Event::error("Validation failed: Input is too long."));
        }
        None
    }

    fn spawn_validate(&self, prompt: String) -> JoinHandle<Event> {
        let model = Arc::clone(&self.model);
        tokio::spawn(async move {
            match model.complete(&prompt).await {
                Ok(raw) => validation_event_from(&raw),
                Err(transport) => {
                    debug!(error = %transport, "validation branch transport failure");
                    Event::error("Validation failed: the validator was unreachable.")
                }
            }
        })
    }

    fn spawn_draft(&self, prompt: String) -> JoinHandle<Event> {
        let model = Arc::clone(&self.model);
        tokio::spawn(async move {
            match model.complete(&prompt).await {
                Ok(raw) => response_event_from(&raw),
                Err(transport) => {
                    debug!(error = %transport, "draft branch transport failure");
                    Event::error("The simulator could not respond.")
                }
            }
        })
    }

    /// Resolves one player action into a finite sequence of events.
    ///
    /// The validation and draft branches run concurrently. The
    /// controller stops early when validation fails decisively, when
    /// the caller's timeout elapses, or when the cancellation token
    /// fires; in every early-stop case the still-running branch is
    /// aborted so its late result can never be observed. Exactly one
    /// terminal event is produced per call.
    pub async fn resolve(
        &self,
        user_input: &str,
        ctx: &TurnContext<'_>,
        opts: &TurnOptions,
    ) -> TurnResolution {
        let mut state = TurnState::new(user_input);

        // Rules that need no model call decide the turn on their own.
        if let Some(rejection) = Self::local_validation(user_input) {
            state.validation_message = Some(rejection.clone());
            state.final_message = Some(rejection.clone());
            return TurnResolution {
                events: vec![rejection.clone()],
                final_message: rejection,
            };
        }

        let draft_event = Event::user(user_input);
        let validator_prompt = render_validator(&PromptContext {
            pc: ctx.pc,
            npc: ctx.npc,
            history: ctx.history,
            event_draft: Some(&draft_event),
            invalid_reason: ctx.invalid_reason,
        });
        let responder_prompt = render_responder(&PromptContext {
            pc: ctx.pc,
            npc: ctx.npc,
            history: ctx.history,
            event_draft: None,
            invalid_reason: ctx.invalid_reason,
        });

        let mut validate_task = self.spawn_validate(validator_prompt);
        let mut draft_task = self.spawn_draft(responder_prompt);

        let cancel = opts.cancel.clone().unwrap_or_default();
        let deadline = opts.timeout;
        let timeout = async move {
            match deadline {
                Some(budget) => tokio::time::sleep(budget).await,
                None => future::pending::<()>().await,
            }
        };
        tokio::pin!(timeout);

        let final_message = loop {
            tokio::select! {
                joined = &mut validate_task, if state.validation_message.is_none() => {
                    let outcome = joined.unwrap_or_else(|join_err| {
                        debug!(error = %join_err, "validation branch did not complete");
                        Event::error("Validation did not run or produced no result.")
                    });
                    debug!(kind = ?outcome.kind, "validation branch finished");
                    let decisive = outcome.is_error();
                    state.validation_message = Some(outcome);
                    if decisive {
                        // Validation always overrides the draft.
                        draft_task.abort();
                        break finalize(&state);
                    }
                    if state.response_message.is_some() {
                        break finalize(&state);
                    }
                }
                joined = &mut draft_task, if state.response_message.is_none() => {
                    let outcome = joined.unwrap_or_else(|join_err| {
                        debug!(error = %join_err, "draft branch did not complete");
                        Event::error("The simulator could not respond.")
                    });
                    debug!(kind = ?outcome.kind, "draft branch finished");
                    state.response_message = Some(outcome);
                    if state.validation_message.is_some() {
                        break finalize(&state);
                    }
                }
                () = &mut timeout => {
                    validate_task.abort();
                    draft_task.abort();
                    break Event::error("Turn timed out.");
                }
                () = cancel.cancelled() => {
                    validate_task.abort();
                    draft_task.abort();
                    break Event::error("Turn cancelled.");
                }
            }
        };

        state.final_message = Some(final_message.clone());

        let mut events = Vec::with_capacity(2);
        if let Some(validation) = &state.validation_message {
            if *validation != final_message {
                events.push(validation.clone());
            }
        }
        events.push(final_message.clone());

        TurnResolution {
            events,
            final_message,
        }
    }

    /// Drafts the opening scene against an empty action history.
    ///
    /// Only the draft branch runs; there is no player action to
    /// validate yet. The same timeout and cancellation handling applies.
    pub async fn open_scene(&self, ctx: &TurnContext<'_>, opts: &TurnOptions) -> Event {
        let responder_prompt = render_responder(&PromptContext {
            pc: ctx.pc,
            npc: ctx.npc,
            history: &[],
            event_draft: None,
            invalid_reason: None,
        });

        let mut draft_task = self.spawn_draft(responder_prompt);

        let cancel = opts.cancel.clone().unwrap_or_default();
        let deadline = opts.timeout;
        let timeout = async move {
            match deadline {
                Some(budget) => tokio::time::sleep(budget).await,
                None => future::pending::<()>().await,
            }
        };
        tokio::pin!(timeout);

        tokio::select! {
            joined = &mut draft_task => joined.unwrap_or_else(|join_err| {
                debug!(error = %join_err, "opening draft did not complete");
                Event::error("The simulator could not respond.")
            }),
            () = &mut timeout => {
                draft_task.abort();
                Event::error("Turn timed out.")
            }
            () = cancel.cancelled() => {
                draft_task.abort();
                Event::error("Turn cancelled.")
            }
        }
    }
}
