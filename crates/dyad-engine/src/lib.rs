//! Dyad Engine — concurrent turn resolution.
//!
//! One call to [`TurnResolver::resolve`] runs the validation check and
//! the in-character draft concurrently, reconciles their outcomes into
//! exactly one final event, and supports early termination on a
//! decisive validation error, a timeout, or external cancellation.
//! Content-level failures (rejected input, unreachable model, malformed
//! model output) never cross the engine boundary as errors; callers
//! always receive well-formed events.

mod resolver;
mod state;
mod verdict;

pub use resolver::{TurnContext, TurnOptions, TurnResolution, TurnResolver};
pub use state::{TurnState, finalize};
