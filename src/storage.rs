use std::{
    fs,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Utc};
use log::{debug, info, trace, warn};
use rusqlite::{params, Connection, Row};
use tokio::{sync::OnceCell, task};

use crate::{DatabaseLocation, Note, NoteError, Result};

const CREATE_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS notes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
)";

const SELECT_COLUMNS: &str = "SELECT id, title, content, created_at, updated_at FROM notes";

const NEWEST_FIRST: &str = "ORDER BY updated_at DESC, id DESC";

/// Durable storage for notes in a single SQLite file.
///
/// The connection is opened lazily on first use and reused for the lifetime
/// of the gateway. Concurrent first accesses wait on the same initialization,
/// so only one connection is ever opened.
pub struct NoteGateway {
    /// Where the database lives
    location: DatabaseLocation,

    /// The single connection, created by `initialize`
    conn: OnceCell<Arc<Mutex<Connection>>>,
}

impl NoteGateway {
    /// Creates a gateway for the given location without touching the disk.
    pub fn new(location: DatabaseLocation) -> Self {
        Self {
            location,
            conn: OnceCell::new(),
        }
    }

    /// Creates a gateway backed by a private in-memory database
    pub fn in_memory() -> Self {
        Self::new(DatabaseLocation::InMemory)
    }

    pub fn location(&self) -> &DatabaseLocation {
        &self.location
    }

    /// Whether the connection has been opened yet
    pub fn is_initialized(&self) -> bool {
        self.conn.initialized()
    }

    /// Opens the database and creates the `notes` table if needed.
    ///
    /// Safe to call any number of times; every operation calls it first.
    pub async fn initialize(&self) -> Result<()> {
        self.connection().await.map(|_| ())
    }

    async fn connection(&self) -> Result<Arc<Mutex<Connection>>> {
        let conn = self
            .conn
            .get_or_try_init(|| async {
                let location = self.location.clone();
                info!("Opening note database at {}", location);

                let conn = task::spawn_blocking(move || open_connection(&location)).await??;
                Ok::<_, NoteError>(Arc::new(Mutex::new(conn)))
            })
            .await?;

        Ok(Arc::clone(conn))
    }

    /// Runs `op` against the connection on the blocking thread pool
    async fn with_connection<T, F>(&self, op: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.connection().await?;

        task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| NoteError::LockAcquisitionFailed {
                message: "Failed to acquire lock on the note database connection".to_string(),
            })?;
            op(&guard).map_err(NoteError::Database)
        })
        .await?
    }

    /// Inserts a new note, ignoring any id it carries
    ///
    /// # Returns
    ///
    /// The id assigned by the store
    pub async fn insert(&self, note: &Note) -> Result<i64> {
        debug!("Inserting note '{}'", note.title);
        let note = note.clone();

        let id = self
            .with_connection(move |conn| {
                conn.execute(
                    "INSERT INTO notes (title, content, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![
                        note.title,
                        note.content,
                        note.created_at.timestamp_millis(),
                        note.updated_at.timestamp_millis()
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        info!("Inserted note with id {}", id);
        Ok(id)
    }

    /// Returns every note, most recently modified first
    pub async fn list_all(&self) -> Result<Vec<Note>> {
        let notes = self
            .with_connection(|conn| {
                let mut stmt = conn.prepare(&format!("{} {}", SELECT_COLUMNS, NEWEST_FIRST))?;
                let notes = stmt
                    .query_map([], row_to_note)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(notes)
            })
            .await?;

        trace!("Listed {} notes", notes.len());
        Ok(notes)
    }

    /// Returns notes whose title or content contains `needle`.
    ///
    /// Matching is case-sensitive and the ordering matches [`list_all`](Self::list_all).
    /// An empty needle matches every note.
    pub async fn search(&self, needle: &str) -> Result<Vec<Note>> {
        debug!("Searching notes for '{}'", needle);
        let needle = needle.to_string();

        let notes = self
            .with_connection(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE instr(title, ?1) > 0 OR instr(content, ?1) > 0 {}",
                    SELECT_COLUMNS, NEWEST_FIRST
                ))?;
                let notes = stmt
                    .query_map(params![needle], row_to_note)?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(notes)
            })
            .await?;

        trace!("Search matched {} notes", notes.len());
        Ok(notes)
    }

    /// Overwrites title, content and `updated_at` of the row with the note's id.
    ///
    /// # Returns
    ///
    /// The number of rows affected; zero when no row has that id
    pub async fn update(&self, note: &Note) -> Result<usize> {
        let id = note.id.ok_or(NoteError::MissingId)?;
        debug!("Updating note {}", id);
        let note = note.clone();

        let affected = self
            .with_connection(move |conn| {
                conn.execute(
                    "UPDATE notes SET title = ?1, content = ?2, updated_at = ?3 WHERE id = ?4",
                    params![note.title, note.content, note.updated_at.timestamp_millis(), id],
                )
            })
            .await?;

        if affected == 0 {
            warn!("Update of note {} affected no rows", id);
        }
        Ok(affected)
    }

    /// Removes the row with `id`.
    ///
    /// # Returns
    ///
    /// The number of rows affected; zero when no row has that id
    pub async fn delete(&self, id: i64) -> Result<usize> {
        debug!("Deleting note {}", id);

        let affected = self
            .with_connection(move |conn| conn.execute("DELETE FROM notes WHERE id = ?1", params![id]))
            .await?;

        if affected == 0 {
            warn!("Delete of note {} affected no rows", id);
        } else {
            info!("Note {} deleted", id);
        }
        Ok(affected)
    }
}

fn open_connection(location: &DatabaseLocation) -> Result<Connection> {
    let conn = match location {
        DatabaseLocation::File(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    debug!("Creating database directory: {}", parent.display());
                    fs::create_dir_all(parent).map_err(|_| NoteError::DirectoryError {
                        path: parent.to_path_buf(),
                    })?;
                }
            }
            Connection::open(path)?
        }
        DatabaseLocation::InMemory => Connection::open_in_memory()?,
    };

    conn.execute_batch(CREATE_SCHEMA)?;
    Ok(conn)
}

fn row_to_note(row: &Row<'_>) -> rusqlite::Result<Note> {
    Ok(Note {
        id: Some(row.get(0)?),
        title: row.get(1)?,
        content: row.get(2)?,
        created_at: millis_to_datetime(row, 3)?,
        updated_at: millis_to_datetime(row, 4)?,
    })
}

fn millis_to_datetime(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(idx)?;
    DateTime::<Utc>::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, millis))
}
