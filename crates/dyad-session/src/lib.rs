//! Dyad Session — the session state machine and its surroundings.
//!
//! A session drives one player/NPC scene through its lifecycle
//! (`ENTER -> UPDATE -> COMPLETE/EXIT`), owns the conversation history,
//! dispatches slash-commands, and delegates freeform turns to the
//! turn-resolution engine. Each live session is wrapped in a dedicated
//! worker task so that turns are strictly sequential per session while
//! distinct sessions run fully in parallel; the registry is the shared
//! map of live sessions.

mod game;
mod lifecycle;
mod registry;
mod session;
mod worker;

pub use game::{FormQuestion, GameConfig, OpeningKind};
pub use lifecycle::Lifecycle;
pub use registry::SessionRegistry;
pub use session::{CharacterSummary, CreateRequest, Session, SessionDeps, SessionMeta, SessionView};
pub use worker::SessionHandle;
