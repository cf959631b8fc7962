//! Dyad Store — document storage and identity collaborators.
//!
//! In-memory implementations of the character, player and run ports
//! plus a filesystem run store. The in-memory stores are the process's
//! source of truth for their collections; nothing here survives a
//! restart except run snapshots written by [`FsRunStore`].

mod characters;
mod players;
mod runs;

pub use characters::InMemoryCharacterStore;
pub use players::InMemoryPlayerDirectory;
pub use runs::{FsRunStore, InMemoryRunStore};
