//! The session state machine.
//!
//! A [`Session`] owns one run: the bound game config and character
//! sheets, the conversation history, and the lifecycle position. All
//! mutation goes through [`Session::step`] and [`Session::exit`]; the
//! per-session worker serializes calls so a session never sees two
//! turns at once.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use dyad_core::character::CharacterSheet;
use dyad_core::clock::Clock;
use dyad_core::error::SimError;
use dyad_core::event::Event;
use dyad_core::store::{CharacterStore, PlayerDirectory, RunSnapshot, RunStore};
use dyad_engine::{TurnContext, TurnOptions, TurnResolver};
use rand::RngCore;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::game::{GameConfig, OpeningKind};
use crate::lifecycle::Lifecycle;

/// Everything a caller supplies to start a run.
#[derive(Debug, Clone, Default)]
pub struct CreateRequest {
    /// Game name (resolved case-insensitively) or explicit config path.
    pub game: String,
    /// Where the run originates (e.g. `api`, `cli`); part of the run id.
    pub source: String,
    /// Player character handle; the game's default when absent.
    pub pc_choice: Option<String>,
    /// Simulator character handle; the game's default when absent.
    pub npc_choice: Option<String>,
    /// Raw access key to resolve into a player identity.
    pub access_key: Option<String>,
    /// Pre-resolved player identity; wins over `access_key`.
    pub player_id: Option<String>,
}

/// Collaborators a session needs at creation time.
#[derive(Clone)]
pub struct SessionDeps {
    /// Character sheet lookup.
    pub characters: Arc<dyn CharacterStore>,
    /// Access-key resolution.
    pub players: Arc<dyn PlayerDirectory>,
    /// Run timestamps and ids.
    pub clock: Arc<dyn Clock>,
    /// The turn-resolution engine.
    pub resolver: Arc<TurnResolver>,
}

/// Compact character description for snapshots and listings.
#[derive(Debug, Clone, Serialize)]
pub struct CharacterSummary {
    pub hid: String,
    pub name: String,
    pub archetype: String,
    pub short_description: String,
}

impl From<&CharacterSheet> for CharacterSummary {
    fn from(sheet: &CharacterSheet) -> Self {
        Self {
            hid: sheet.hid.clone(),
            name: sheet.name.clone(),
            archetype: sheet.archetype.clone(),
            short_description: sheet.short_description.clone(),
        }
    }
}

/// Point-in-time run bookkeeping.
#[derive(Debug, Clone, Serialize)]
pub struct SessionMeta {
    /// The run id.
    pub name: String,
    /// Completed turns (`history.len() / 2`).
    pub turns: usize,
    /// Whole seconds since the run started (until exit, once exited).
    pub runtime_seconds: i64,
    /// `runtime_seconds` rendered as `HH:MM:SS`.
    pub runtime_string: String,
    /// Current lifecycle state.
    pub lifecycle: Lifecycle,
    pub exited: bool,
    pub exit_reason: String,
    /// Whether a snapshot has been persisted.
    pub saved: bool,
    /// Location of the last persisted snapshot, if any.
    pub output_path: Option<String>,
}

/// Read-only view of a session for API snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub run_id: String,
    pub game_name: String,
    pub lifecycle: Lifecycle,
    pub turns: usize,
    pub history: Vec<Event>,
    pub pc: CharacterSummary,
    pub npc: CharacterSummary,
    pub player_id: Option<String>,
    pub exited: bool,
    pub exit_reason: String,
}

/// One live run of a game.
pub struct Session {
    run_id: String,
    game: GameConfig,
    pc: CharacterSheet,
    npc: CharacterSheet,
    player_id: Option<String>,
    lifecycle: Lifecycle,
    history: Vec<Event>,
    last_invalid_reason: Option<String>,
    exited: bool,
    exit_reason: String,
    started_at: chrono::DateTime<chrono::Utc>,
    ended_at: Option<chrono::DateTime<chrono::Utc>>,
    saved: bool,
    output_path: Option<String>,
    cancel: CancellationToken,
    clock: Arc<dyn Clock>,
    resolver: Arc<TurnResolver>,
}

fn slug(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}

fn new_run_id(game_name: &str, source: &str, clock: &dyn Clock) -> String {
    let mut bytes = [0u8; 2];
    rand::rng().fill_bytes(&mut bytes);
    let suffix: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    let stamp = clock.now().format("%Y%m%d%H%M%S");
    let source = if source.trim().is_empty() {
        "local"
    } else {
        source.trim()
    };
    format!("{}-{}-{}-{}", slug(game_name), slug(source), stamp, suffix)
}

fn runtime_string(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

impl Session {
    /// Creates a new session in the `Enter` state.
    ///
    /// Resolves the game config, both character sheets and the player
    /// identity before any state is constructed, so a failed create
    /// leaves nothing behind.
    ///
    /// # Errors
    ///
    /// - [`SimError::GameNotFound`] / [`SimError::GameValidation`] for
    ///   config resolution and PC/NPC constraint violations;
    /// - [`SimError::CharacterNotFound`] for unknown handles;
    /// - [`SimError::Authorization`] when an access key cannot be
    ///   resolved, or a consent-gated game gets no identity at all.
    #[instrument(skip(deps), fields(game = %request.game))]
    pub async fn create(
        request: CreateRequest,
        games_dir: &Path,
        deps: &SessionDeps,
    ) -> Result<Self, SimError> {
        let game = GameConfig::resolve(games_dir, &request.game)?;

        let pc_hid = request
            .pc_choice
            .unwrap_or_else(|| game.default_pc.clone());
        if let Some(required) = &game.pc_must_be {
            if pc_hid != *required {
                return Err(SimError::GameValidation(format!(
                    "game {:?} requires the player character {required:?}, got {pc_hid:?}",
                    game.name
                )));
            }
        }
        let npc_hid = request
            .npc_choice
            .unwrap_or_else(|| game.default_npc.clone());
        if game.npc_exclude.contains(&npc_hid) {
            return Err(SimError::GameValidation(format!(
                "game {:?} does not allow {npc_hid:?} as the simulator character",
                game.name
            )));
        }

        let pc = deps.characters.find_by_hid(&pc_hid).await?;
        let npc = deps.characters.find_by_hid(&npc_hid).await?;

        let player_id = match (request.player_id, request.access_key) {
            (Some(id), _) => Some(id),
            (None, Some(key)) => match deps.players.resolve_player_id(&key).await? {
                Some(id) => Some(id),
                None => {
                    return Err(SimError::Authorization(
                        "access key is unknown or revoked".to_owned(),
                    ));
                }
            },
            (None, None) => None,
        };
        if game.requires_consent && player_id.is_none() {
            return Err(SimError::Authorization(format!(
                "game {:?} requires a consented player identity",
                game.name
            )));
        }

        let run_id = new_run_id(&game.name, &request.source, deps.clock.as_ref());
        info!(%run_id, pc = %pc.hid, npc = %npc.hid, "session created");

        Ok(Self {
            run_id,
            game,
            pc,
            npc,
            player_id,
            lifecycle: Lifecycle::Enter,
            history: Vec::new(),
            last_invalid_reason: None,
            exited: false,
            exit_reason: String::new(),
            started_at: deps.clock.now(),
            ended_at: None,
            saved: false,
            output_path: None,
            cancel: CancellationToken::new(),
            clock: Arc::clone(&deps.clock),
            resolver: Arc::clone(&deps.resolver),
        })
    }

    /// The run id.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    /// The conversation history so far.
    #[must_use]
    pub fn history(&self) -> &[Event] {
        &self.history
    }

    /// Completed turn count. One turn appends a user/outcome pair, so
    /// history length stays even and this is always `len / 2`.
    #[must_use]
    pub fn turns(&self) -> usize {
        self.history.len() / 2
    }

    fn turn_options(&self) -> TurnOptions {
        TurnOptions {
            timeout: self.game.turn_timeout_secs.map(Duration::from_secs),
            cancel: Some(self.cancel.clone()),
        }
    }

    fn turn_context<'a>(&'a self, history: &'a [Event]) -> TurnContext<'a> {
        TurnContext {
            pc: &self.pc,
            npc: &self.npc,
            history,
            invalid_reason: self.last_invalid_reason.as_deref(),
        }
    }

    /// Advances the session by one step.
    ///
    /// What a step does depends on the lifecycle state: the `Enter`
    /// step ignores its input and opens the scene; `Update` steps run
    /// slash-commands or full turns; `Complete` steps still answer
    /// commands but reject freeform input.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::InvalidLifecycleTransition`] when the
    /// session has exited.
    #[instrument(skip(self, input), fields(run_id = %self.run_id, lifecycle = %self.lifecycle))]
    pub async fn step(&mut self, input: &str) -> Result<Vec<Event>, SimError> {
        match self.lifecycle {
            Lifecycle::Enter => Ok(self.enter_step().await),
            Lifecycle::Update => {
                if let Some(command) = input.trim().strip_prefix('/') {
                    return Ok(self.dispatch_command(command));
                }
                Ok(self.freeform_turn(input).await)
            }
            Lifecycle::Complete => {
                if let Some(command) = input.trim().strip_prefix('/') {
                    return Ok(self.dispatch_command(command));
                }
                // Rejected, not recorded: the run is over.
                Ok(vec![Event::error(
                    "This run is complete and no longer accepts actions.",
                )])
            }
            Lifecycle::Exit => Err(SimError::InvalidLifecycleTransition(format!(
                "run {} has exited and cannot step",
                self.run_id
            ))),
        }
    }

    /// The `Enter` step: welcome the player and open the scene.
    async fn enter_step(&mut self) -> Vec<Event> {
        let welcome = Event::info(&self.game.welcome_message);

        let drafted = self
            .resolver
            .open_scene(&self.turn_context(&[]), &self.turn_options())
            .await;
        // The game decides how the opening reads; engine failures pass
        // through unchanged.
        let opening = if drafted.is_error() {
            drafted
        } else {
            match self.game.opening {
                OpeningKind::Info => Event::info(drafted.content),
                OpeningKind::Assistant => Event::assistant(drafted.content),
            }
        };

        self.history.push(welcome.clone());
        self.history.push(opening.clone());
        self.lifecycle = Lifecycle::Update;
        vec![welcome, opening]
    }

    /// One freeform player turn through the engine.
    async fn freeform_turn(&mut self, input: &str) -> Vec<Event> {
        // Echo the action first; the engine sees the history as it was
        // before this turn began.
        let prior = self.history.clone();
        self.history.push(Event::user(input));

        let resolution = self
            .resolver
            .resolve(input, &self.turn_context(&prior), &self.turn_options())
            .await;

        let final_message = resolution.final_message;
        if final_message.is_error() {
            if let Some(reason) = final_message.content.strip_prefix("Validation failed: ") {
                // Fed back into the next render so the model sees why
                // its last attempt was rejected.
                self.last_invalid_reason = Some(reason.to_owned());
            }
        } else {
            self.last_invalid_reason = None;
        }
        self.history.push(final_message);

        resolution.events
    }

    /// Answers a slash-command without involving the engine.
    fn dispatch_command(&mut self, command: &str) -> Vec<Event> {
        match command {
            "help" => {
                let body = if self.game.help_text.trim().is_empty() {
                    "Available commands: /help, /abilities, /complete.".to_owned()
                } else {
                    self.game.help_text.clone()
                };
                vec![Event::info(body)]
            }
            "abilities" => vec![Event::info(format!(
                "{} abilities: {}",
                self.pc.name,
                self.pc.abilities.join(", ")
            ))],
            "complete" => self.complete_step(),
            "guess" if self.game.goal_inference => self.complete_step(),
            other => vec![Event::error(format!("Unknown command: /{other}"))],
        }
    }

    /// Moves the run to `Complete` and surfaces the completion form.
    fn complete_step(&mut self) -> Vec<Event> {
        self.lifecycle = Lifecycle::Complete;
        let mut events = vec![Event::info("The run is complete.")];
        for question in &self.game.completion_form {
            events.push(Event::info(&question.prompt));
        }
        events
    }

    /// Ends the run. Idempotent: the first call records the reason and
    /// the end time; later calls change nothing.
    #[instrument(skip(self), fields(run_id = %self.run_id))]
    pub fn exit(&mut self, reason: &str) {
        if self.exited {
            return;
        }
        self.exited = true;
        self.exit_reason = reason.to_owned();
        self.ended_at = Some(self.clock.now());
        self.lifecycle = Lifecycle::Exit;
        self.cancel.cancel();
        info!(reason, "session exited");
    }

    /// Persists a [`RunSnapshot`] through the store and records where
    /// it was written.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Persistence`] when the store write fails.
    pub async fn save(&mut self, store: &dyn RunStore) -> Result<String, SimError> {
        let location = store.save_run(&self.snapshot()).await?;
        self.saved = true;
        self.output_path = Some(location.clone());
        Ok(location)
    }

    /// The persistable form of this session.
    #[must_use]
    pub fn snapshot(&self) -> RunSnapshot {
        RunSnapshot {
            run_id: self.run_id.clone(),
            game_name: self.game.name.clone(),
            lifecycle: self.lifecycle.to_string(),
            history: self.history.clone(),
            turns: self.turns(),
            pc_hid: self.pc.hid.clone(),
            npc_hid: self.npc.hid.clone(),
            player_id: self.player_id.clone(),
            exited: self.exited,
            exit_reason: self.exit_reason.clone(),
            started_at: self.started_at,
            ended_at: self.ended_at,
        }
    }

    /// Point-in-time bookkeeping for this run.
    #[must_use]
    pub fn meta(&self) -> SessionMeta {
        let until = self.ended_at.unwrap_or_else(|| self.clock.now());
        let runtime_seconds = (until - self.started_at).num_seconds();
        SessionMeta {
            name: self.run_id.clone(),
            turns: self.turns(),
            runtime_seconds,
            runtime_string: runtime_string(runtime_seconds),
            lifecycle: self.lifecycle,
            exited: self.exited,
            exit_reason: self.exit_reason.clone(),
            saved: self.saved,
            output_path: self.output_path.clone(),
        }
    }

    /// Read-only view for API snapshots.
    #[must_use]
    pub fn view(&self) -> SessionView {
        SessionView {
            run_id: self.run_id.clone(),
            game_name: self.game.name.clone(),
            lifecycle: self.lifecycle,
            turns: self.turns(),
            history: self.history.clone(),
            pc: CharacterSummary::from(&self.pc),
            npc: CharacterSummary::from(&self.npc),
            player_id: self.player_id.clone(),
            exited: self.exited,
            exit_reason: self.exit_reason.clone(),
        }
    }
}
