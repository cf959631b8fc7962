//! Shared test doubles for the Dyad simulation engine.

mod clock;
mod model;
mod store;

pub use clock::FixedClock;
pub use model::{FailingModel, ScriptedModel};
pub use store::{FailingRunStore, RecordingRunStore};
