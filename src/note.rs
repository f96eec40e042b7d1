//! Core data structure for the pocketnotes application.
//!
//! A [`Note`] is the only persisted entity. Its id is assigned by the store on
//! insert; timestamps are kept at millisecond precision so that a note read
//! back from the database compares equal to the value that was written.
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::now_millis;

/// Represents a single note in our system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Store-assigned identifier, `None` until the note is inserted
    pub id: Option<i64>,
    /// Note title
    pub title: String,
    /// Free text content, may be empty
    pub content: String,
    /// When the note was created
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl Note {
    /// Creates a new, not yet persisted note stamped with the current time
    pub fn new(title: String, content: String) -> Self {
        let now = now_millis();

        Note {
            id: None,
            title,
            content,
            created_at: now,
            updated_at: now,
        }
    }

    /// Returns an edited copy with the same id and creation time.
    ///
    /// `updated_at` always moves forward by at least one millisecond, even
    /// when the edit lands in the same millisecond or the wall clock steps back.
    pub fn edited(&self, title: String, content: String) -> Self {
        let now = now_millis().max(self.updated_at + Duration::milliseconds(1));

        Note {
            id: self.id,
            title,
            content,
            created_at: self.created_at,
            updated_at: now,
        }
    }

    /// Returns a copy carrying the id the store assigned
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_note_has_no_id_and_equal_timestamps() {
        let note = Note::new("Groceries".to_string(), "Milk, eggs".to_string());

        assert!(note.id.is_none());
        assert_eq!(note.created_at, note.updated_at);
        assert_eq!(note.created_at.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn edited_keeps_identity_and_creation_time() {
        let original = Note::new("Alpha".to_string(), "x".to_string()).with_id(7);
        let edited = original.edited("Alpha2".to_string(), "y".to_string());

        assert_eq!(edited.id, Some(7));
        assert_eq!(edited.created_at, original.created_at);
        assert!(edited.updated_at > original.updated_at);
        assert_eq!(edited.title, "Alpha2");
        assert_eq!(edited.content, "y");
    }

    #[test]
    fn edited_never_moves_updated_at_backwards() {
        let mut original = Note::new("Future".to_string(), String::new()).with_id(1);
        original.updated_at += Duration::hours(1);

        let edited = original.edited("Future".to_string(), "later".to_string());
        assert_eq!(edited.updated_at, original.updated_at + Duration::milliseconds(1));
    }

    #[test]
    fn edit_right_after_new_advances_updated_at() {
        let original = Note::new("Quick".to_string(), String::new()).with_id(3);

        let mut previous = original.clone();
        for round in 0..50 {
            let edited = previous.edited("Quick".to_string(), format!("v{}", round));
            assert!(edited.updated_at > previous.updated_at);
            assert_eq!(edited.created_at, original.created_at);
            previous = edited;
        }
    }
}
