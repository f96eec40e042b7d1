//! Error types for the pocketnotes application.
//!
//! This module defines custom error types that categorize the different failures
//! that can occur while storing, loading and editing notes.

use std::{io, path::PathBuf};

use thiserror::Error;

/// The main error type for the pocketnotes application.
#[derive(Error, Debug)]
pub enum NoteError {
    /// Errors related to file I/O operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Errors reported by the SQLite store.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Errors related to serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A blocking storage task panicked or was cancelled.
    #[error("Storage task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    /// A note title was empty (or whitespace only).
    #[error("Note title must not be empty")]
    EmptyTitle,

    /// Note was not found among the loaded notes.
    #[error("Note not found: {id}")]
    NoteNotFound { id: i64 },

    /// An update was requested for a note that was never persisted.
    #[error("Note has no id; it must be inserted before it can be updated")]
    MissingId,

    /// for mutex lock acquisition issues
    #[error("{message}")]
    LockAcquisitionFailed { message: String },

    /// Errors related to configuration.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Directory creation or access failed.
    #[error("Failed to create or access directory: {path}")]
    DirectoryError { path: PathBuf },

    /// file not found
    #[error("File not found: {file_path}")]
    FileNotFound { file_path: String },

    #[error("{message}")]
    EditorError { message: String },

    /// Generic application error with a custom message.
    #[error("{message}")]
    ApplicationError { message: String },
}
