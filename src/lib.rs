//! Local note-taking library
//!
//! This library provides a SQLite-backed store for short text notes and an
//! in-memory list state that keeps a filtered view of them for presentation.

mod cli;
mod config;
mod errors;
mod helper;
mod note;
mod state;
mod storage;
mod types;

// Re-export key components
pub use cli::*;
pub use config::*;
pub use errors::*;
pub use helper::*;
pub use note::*;
pub use state::*;
pub use storage::*;
pub use types::*;
