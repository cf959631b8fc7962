//! Route modules organized by resource.

pub mod games;
pub mod health;
pub mod players;
pub mod runs;
