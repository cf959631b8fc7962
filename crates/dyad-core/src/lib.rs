//! Dyad Core — shared domain vocabulary.
//!
//! This crate defines the event model, character sheets, the error
//! taxonomy, and the collaborator ports (language model, stores, clock)
//! that every other crate depends on. It contains no infrastructure code.

pub mod character;
pub mod clock;
pub mod error;
pub mod event;
pub mod model;
pub mod store;
