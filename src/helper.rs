use std::{fs, io::Write, path::Path};

use chrono::{DateTime, SubsecRound, Utc};
use log::{debug, error, trace};
use serde::Serialize;
use tempfile::NamedTempFile;

use crate::{Note, NoteError, Result};

/// Current time truncated to the millisecond precision the store keeps
pub fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Rejects titles that are empty once surrounding whitespace is ignored
pub fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        debug!("Rejected note with empty title");
        return Err(NoteError::EmptyTitle);
    }
    Ok(())
}

/// Case-insensitive containment test against title or content.
///
/// `needle` must already be lowercased.
pub fn note_matches(note: &Note, needle: &str) -> bool {
    note.title.to_lowercase().contains(needle) || note.content.to_lowercase().contains(needle)
}

/// Returns the notes matching `query`, preserving their order.
///
/// An empty query matches everything.
pub fn filter_notes(notes: &[Note], query: &str) -> Vec<Note> {
    if query.is_empty() {
        return notes.to_vec();
    }

    let needle = query.to_lowercase();
    let visible: Vec<Note> = notes
        .iter()
        .filter(|note| note_matches(note, &needle))
        .cloned()
        .collect();

    trace!(
        "Filter '{}' kept {} of {} notes",
        query,
        visible.len(),
        notes.len()
    );
    visible
}

/// First non-empty line of `content`, shortened to `max_len` characters
pub fn content_preview(content: &str, max_len: usize) -> String {
    let first_line = content
        .lines()
        .find(|line| !line.trim().is_empty())
        .unwrap_or("");

    if first_line.chars().count() <= max_len {
        first_line.to_string()
    } else {
        let shortened: String = first_line.chars().take(max_len).collect();
        format!("{}...", shortened)
    }
}

/// Serializes `value` as pretty JSON and writes it to `path` atomically
pub fn write_json_atomically<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    if !dir.exists() {
        debug!("Creating parent directory: {}", dir.display());
        fs::create_dir_all(dir).map_err(|e| {
            error!("Failed to create directory {}: {}", dir.display(), e);
            NoteError::DirectoryError {
                path: dir.to_path_buf(),
            }
        })?;
    }

    let json = serde_json::to_string_pretty(value)?;

    let mut temp_file = NamedTempFile::new_in(dir)?;
    temp_file.write_all(json.as_bytes())?;
    temp_file.flush()?;

    temp_file.persist(path).map_err(|e| {
        error!("Failed to persist file {}: {}", path.display(), e.error);
        NoteError::Io(e.error)
    })?;

    debug!("Wrote {} bytes to {}", json.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn note(title: &str, content: &str) -> Note {
        Note::new(title.to_string(), content.to_string())
    }

    #[test]
    fn empty_and_blank_titles_are_rejected() {
        assert!(matches!(validate_title(""), Err(NoteError::EmptyTitle)));
        assert!(matches!(validate_title("  \t"), Err(NoteError::EmptyTitle)));
        assert!(validate_title(" Groceries ").is_ok());
    }

    #[test]
    fn filter_is_case_insensitive_over_title_and_content() {
        let notes = vec![note("Alpha", "x"), note("Beta", "y"), note("Gamma", "ALPine")];

        let visible = filter_notes(&notes, "alp");
        let titles: Vec<&str> = visible.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Gamma"]);
    }

    #[test]
    fn empty_query_keeps_everything_in_order() {
        let notes = vec![note("Alpha", "x"), note("Beta", "y")];
        assert_eq!(filter_notes(&notes, ""), notes);
    }

    #[test]
    fn query_without_matches_yields_nothing() {
        let notes = vec![note("Alpha", "x")];
        assert!(filter_notes(&notes, "zeta").is_empty());
    }

    #[test]
    fn preview_uses_first_non_empty_line() {
        assert_eq!(content_preview("\n\n  \nhello\nworld", 100), "hello");
        assert_eq!(content_preview("", 10), "");
    }

    #[test]
    fn preview_shortens_on_char_boundaries() {
        assert_eq!(content_preview("héllo wörld", 5), "héllo...");
    }

    #[test]
    fn json_is_written_atomically_into_new_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("notes.json");

        write_json_atomically(&path, &vec![note("Alpha", "x")]).unwrap();

        let written: Vec<Note> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0].title, "Alpha");
    }
}
