//! Shared types for the pocketnotes application.
//!
//! This module contains the crate-wide `Result` alias, the description of where
//! the note database lives, and the subcommands understood by the CLI.
use std::{fmt, path::PathBuf};

use clap::Subcommand;

use crate::NoteError;

/// A specialized Result type for pocketnotes operations.
pub type Result<T> = std::result::Result<T, NoteError>;

/// Where the SQLite note database is opened from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    /// A database file, created on first access
    File(PathBuf),
    /// A private in-memory database that lives as long as its connection
    InMemory,
}

impl fmt::Display for DatabaseLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseLocation::File(path) => write!(f, "{}", path.display()),
            DatabaseLocation::InMemory => write!(f, ":memory:"),
        }
    }
}

/// Available subcommands for the pocketnotes application
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new note
    Create {
        /// Title of the note
        #[clap(short = 'T', long)]
        title: String,

        /// Content of the note
        #[clap(short, long)]
        content: Option<String>,

        /// Open content in editor before saving
        #[clap(short, long)]
        edit: bool,

        /// Path to a file containing the note's content
        #[clap(short, long)]
        file: Option<PathBuf>,
    },

    /// View a note by ID
    View {
        /// ID of the note to view
        id: i64,

        /// Format output as raw JSON
        #[clap(short, long)]
        json: bool,
    },

    /// List notes, most recently modified first
    List {
        /// Only show notes whose title or content contains this text (case-insensitive)
        #[clap(short = 'F', long)]
        filter: Option<String>,

        /// Limit the number of notes returned (0 means no limit)
        #[clap(short = 'n', long, default_value_t = 10)]
        limit: usize,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,

        /// Only show note IDs and titles
        #[clap(short, long)]
        brief: bool,
    },

    /// Search stored notes for an exact (case-sensitive) substring
    Search {
        /// Search query text
        query: String,

        /// Limit the number of search results (0 means no limit)
        #[clap(short = 'n', long, default_value_t = 10)]
        limit: usize,

        /// Format output as JSON
        #[clap(short, long)]
        json: bool,
    },

    /// Edit an existing note
    Edit {
        /// ID of the note to edit
        id: i64,

        /// New title for the note
        #[clap(short = 'T', long)]
        title: Option<String>,

        /// New content for the note
        #[clap(short, long)]
        content: Option<String>,

        /// Open content in editor before saving
        #[clap(short, long)]
        edit: bool,

        /// Path to a file containing the new note content
        #[clap(short, long)]
        file: Option<PathBuf>,
    },

    /// Delete a note by ID
    Delete {
        /// ID of the note to delete
        id: i64,

        /// Skip confirmation prompt
        #[clap(short, long)]
        force: bool,
    },

    /// Export notes as JSON
    Export {
        /// Path where the JSON file will be written
        #[clap(short, long)]
        output: PathBuf,

        /// Only export notes matching this text (case-insensitive)
        #[clap(short = 'F', long)]
        filter: Option<String>,
    },

    /// Configuration management
    Config {
        /// Show current configuration
        #[clap(short = 'S', long)]
        show: bool,

        /// Write a default configuration file
        #[clap(short, long)]
        init: bool,
    },
}
