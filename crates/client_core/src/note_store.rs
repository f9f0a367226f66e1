use std::sync::Arc;

use shared::{
    domain::{Note, NoteCollection},
    error::NotesError,
};
use storage::KeyValueStore;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const NOTES_STORAGE_KEY: &str = "notes";

/// Sole owner of the note collection and its durable snapshot.
pub struct NoteStore {
    store: Arc<dyn KeyValueStore>,
    notes: Mutex<NoteCollection>,
}

impl NoteStore {
    /// Hydrates from storage. Never fails: absent, blank, unreadable or
    /// malformed snapshots all yield the single default editable note.
    pub async fn open(store: Arc<dyn KeyValueStore>) -> Self {
        let notes = load(store.as_ref()).await;
        Self {
            store,
            notes: Mutex::new(notes),
        }
    }

    pub async fn notes(&self) -> NoteCollection {
        self.notes.lock().await.clone()
    }

    /// Appends `note` and persists the new snapshot. A persist failure keeps
    /// the in-memory append and is returned to the caller for reporting.
    pub async fn append(&self, note: Note) -> Result<NoteCollection, NotesError> {
        let mut guard = self.notes.lock().await;
        let next = guard.append(note);
        *guard = next.clone();
        persist(self.store.as_ref(), &next).await?;
        Ok(next)
    }

    pub async fn remove_at(&self, index: usize) -> Result<NoteCollection, NotesError> {
        let mut guard = self.notes.lock().await;
        let next = guard.remove_at(index)?;
        *guard = next.clone();
        persist(self.store.as_ref(), &next).await?;
        Ok(next)
    }
}

pub async fn load(store: &dyn KeyValueStore) -> NoteCollection {
    let raw = match store.get(NOTES_STORAGE_KEY).await {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!("notes: no stored snapshot, starting with default note");
            return NoteCollection::with_default_note();
        }
        Err(err) => {
            warn!("notes: failed to read stored snapshot, starting fresh: {err:#}");
            return NoteCollection::with_default_note();
        }
    };

    // An explicit `[]` is a user who deleted every note, not a fresh install.
    match serde_json::from_str::<NoteCollection>(&raw) {
        Ok(notes) => notes,
        Err(err) => {
            warn!("notes: stored snapshot is malformed, starting fresh: {err}");
            NoteCollection::with_default_note()
        }
    }
}

/// Overwrites the stored snapshot with `notes`.
pub async fn persist(store: &dyn KeyValueStore, notes: &NoteCollection) -> Result<(), NotesError> {
    let encoded =
        serde_json::to_string(notes).map_err(|err| NotesError::Storage(err.to_string()))?;
    store
        .set(NOTES_STORAGE_KEY, &encoded)
        .await
        .map_err(|err| NotesError::Storage(format!("{err:#}")))
}

#[cfg(test)]
#[path = "tests/note_store_tests.rs"]
mod tests;
