//! In-memory view of the note collection.
//!
//! [`NoteListState`] keeps the full list loaded from the [`NoteGateway`] and a
//! filtered view of it. Every mutation goes through the gateway and is followed
//! by a reload. Consumers learn about changes by subscribing to
//! [`StateChange`] events; a subscription ends when its receiver is dropped.

use std::sync::Arc;

use log::{debug, error, info, warn};
use tokio::sync::broadcast;

use crate::{filter_notes, validate_title, Note, NoteError, NoteGateway, Result};

const EVENT_CAPACITY: usize = 64;

/// A change to the observable state of a [`NoteListState`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    /// A reload began; `loading` is now true
    LoadingStarted,
    /// A reload completed and both lists were replaced
    Reloaded { total: usize, visible: usize },
    /// A reload failed; the previous lists were kept
    ReloadFailed { message: String },
    /// The filter query changed and the visible list was recomputed
    FilterApplied { query: String, visible: usize },
}

/// Holds all loaded notes plus the filtered view shown to the user
pub struct NoteListState {
    gateway: Arc<NoteGateway>,
    all_notes: Vec<Note>,
    visible_notes: Vec<Note>,
    query: String,
    loading: bool,
    events: broadcast::Sender<StateChange>,
}

impl NoteListState {
    /// Creates an empty state bound to `gateway`. Nothing is loaded until
    /// [`reload`](Self::reload) is called.
    pub fn new(gateway: Arc<NoteGateway>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        Self {
            gateway,
            all_notes: Vec::new(),
            visible_notes: Vec::new(),
            query: String::new(),
            loading: false,
            events,
        }
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.events.subscribe()
    }

    pub fn gateway(&self) -> &Arc<NoteGateway> {
        &self.gateway
    }

    pub fn all_notes(&self) -> &[Note] {
        &self.all_notes
    }

    pub fn visible_notes(&self) -> &[Note] {
        &self.visible_notes
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Looks up a loaded note by id
    pub fn note(&self, id: i64) -> Option<&Note> {
        self.all_notes.iter().find(|note| note.id == Some(id))
    }

    fn notify(&self, change: StateChange) {
        // Only fails when nobody is subscribed.
        let _ = self.events.send(change);
    }

    /// Replaces the loaded notes with the gateway's current contents.
    ///
    /// The active query is re-applied to the fresh list. On failure the
    /// previous lists are kept and only `loading` is cleared.
    ///
    /// # Returns
    ///
    /// The number of notes loaded
    pub async fn reload(&mut self) -> Result<usize> {
        self.loading = true;
        self.notify(StateChange::LoadingStarted);

        let result = self.gateway.list_all().await;
        self.loading = false;

        match result {
            Ok(notes) => {
                self.visible_notes = filter_notes(&notes, &self.query);
                self.all_notes = notes;
                debug!(
                    "Reloaded {} notes, {} visible",
                    self.all_notes.len(),
                    self.visible_notes.len()
                );
                self.notify(StateChange::Reloaded {
                    total: self.all_notes.len(),
                    visible: self.visible_notes.len(),
                });
                Ok(self.all_notes.len())
            }
            Err(e) => {
                error!("Failed to reload notes: {}", e);
                self.notify(StateChange::ReloadFailed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Creates and stores a new note, then reloads.
    ///
    /// Once the insert has committed the call succeeds; a failed reload after
    /// it is reported through [`StateChange::ReloadFailed`] only.
    ///
    /// # Returns
    ///
    /// The id assigned to the new note
    pub async fn create(&mut self, title: &str, content: &str) -> Result<i64> {
        validate_title(title)?;

        let note = Note::new(title.to_string(), content.to_string());
        let id = self.gateway.insert(&note).await.map_err(|e| {
            error!("Failed to create note '{}': {}", title, e);
            e
        })?;

        info!("Created note {}", id);
        self.refresh_after_write().await;
        Ok(id)
    }

    /// Replaces the title and content of a loaded note, then reloads.
    ///
    /// Fails with [`NoteError::NoteNotFound`] when `id` is not among the loaded
    /// notes.
    pub async fn edit(&mut self, id: i64, title: &str, content: &str) -> Result<()> {
        validate_title(title)?;

        let current = self.note(id).ok_or_else(|| {
            error!("Cannot edit note {}: not among loaded notes", id);
            NoteError::NoteNotFound { id }
        })?;
        let updated = current.edited(title.to_string(), content.to_string());

        let affected = self.gateway.update(&updated).await.map_err(|e| {
            error!("Failed to update note {}: {}", id, e);
            e
        })?;
        if affected == 0 {
            warn!("Note {} disappeared from the store before it could be updated", id);
        }

        self.refresh_after_write().await;
        Ok(())
    }

    /// Deletes a note, then reloads. As with [`create`](Self::create), a
    /// failed reload does not undo the reported deletion.
    ///
    /// # Returns
    ///
    /// The number of rows removed; zero for an unknown id
    pub async fn remove(&mut self, id: i64) -> Result<usize> {
        let affected = self.gateway.delete(id).await.map_err(|e| {
            error!("Failed to delete note {}: {}", id, e);
            e
        })?;

        self.refresh_after_write().await;
        Ok(affected)
    }

    /// Reloads after a committed write. `reload` already logs and publishes
    /// the failure, and the write itself stands.
    async fn refresh_after_write(&mut self) {
        if self.reload().await.is_err() {
            debug!("Write committed but the note list is stale until the next reload");
        }
    }

    /// Shows only notes whose title or content contains `query`, ignoring case.
    pub fn filter(&mut self, query: &str) {
        self.query = query.to_string();
        self.visible_notes = filter_notes(&self.all_notes, &self.query);

        self.notify(StateChange::FilterApplied {
            query: self.query.clone(),
            visible: self.visible_notes.len(),
        });
    }

    pub fn clear_filter(&mut self) {
        self.filter("");
    }
}
