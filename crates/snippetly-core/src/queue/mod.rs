//! Offline mutation queue
//!
//! Writes attempted while disconnected are appended here and replayed in
//! FIFO order by [`crate::sync::SyncDriver`] once connectivity returns. An
//! entry leaves the queue only through [`OfflineQueue::remove`] after the
//! remote service confirmed it, or through an explicit [`OfflineQueue::clear_all`].

mod action;
pub mod codec;

use std::sync::{Mutex, PoisonError};

use crate::error::Result;
use crate::store::LocalStore;

pub use action::{ActionBody, ActionId, ActionKind, MalformedAction, OfflineAction, QueuedAction};

/// Store key used when none is configured
pub const DEFAULT_QUEUE_KEY: &str = "snippetly_offline_queue";

/// FIFO queue of pending writes persisted in a [`LocalStore`]
pub struct OfflineQueue<S> {
    store: S,
    key: String,
    // Serializes read-modify-write cycles against the store.
    write_lock: Mutex<()>,
}

impl<S: LocalStore> OfflineQueue<S> {
    pub fn new(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Queue stored under [`DEFAULT_QUEUE_KEY`]
    pub fn with_default_key(store: S) -> Self {
        Self::new(store, DEFAULT_QUEUE_KEY)
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Append a write made by `owner_id`.
    ///
    /// Never fails. If the stored queue cannot be read, the new entry is
    /// logged and dropped so existing entries are never overwritten. A stored
    /// document that reads but does not decode is first copied to
    /// [`Self::unreadable_key`].
    pub fn enqueue(&self, owner_id: impl Into<String>, action: OfflineAction) {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let kind = action.kind();

        let raw = match self.store.read(&self.key) {
            Ok(raw) => raw,
            Err(error) => {
                tracing::error!(
                    "Offline queue '{}' is unreadable, dropping queued {} action: {}",
                    self.key,
                    kind,
                    error
                );
                return;
            }
        };

        let mut actions = match raw {
            None => Vec::new(),
            Some(raw) => match codec::decode_actions(&raw) {
                Ok(actions) => actions,
                Err(error) => {
                    if let Err(backup_error) = self.store.write(&self.unreadable_key(), &raw) {
                        tracing::error!(
                            "Offline queue '{}' does not decode ({}) and could not be backed up, dropping queued {} action: {}",
                            self.key,
                            error,
                            kind,
                            backup_error
                        );
                        return;
                    }
                    tracing::warn!(
                        "Offline queue '{}' does not decode, copied it to '{}': {}",
                        self.key,
                        self.unreadable_key(),
                        error
                    );
                    Vec::new()
                }
            },
        };

        let queued = QueuedAction::new(owner_id.into(), action);
        let id = queued.id.clone();
        actions.push(queued);

        match self.save(&actions) {
            Ok(()) => tracing::debug!("Queued {} action {} ({} pending)", kind, id, actions.len()),
            Err(error) => tracing::error!("Failed to persist queued {} action {}: {}", kind, id, error),
        }
    }

    /// Store key holding the last queue document that failed to decode
    pub fn unreadable_key(&self) -> String {
        format!("{}_unreadable", self.key)
    }

    /// All pending actions in enqueue order.
    ///
    /// An unreadable queue is logged and reported as empty.
    pub fn list_pending(&self) -> Vec<QueuedAction> {
        self.load().unwrap_or_else(|error| {
            tracing::error!("Failed to read offline queue '{}': {}", self.key, error);
            Vec::new()
        })
    }

    pub fn len(&self) -> usize {
        self.list_pending().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delete one action; returns whether it was present
    pub fn remove(&self, id: &ActionId) -> Result<bool> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut actions = self.load()?;
        let before = actions.len();
        actions.retain(|action| &action.id != id);
        if actions.len() == before {
            return Ok(false);
        }

        self.save(&actions)?;
        Ok(true)
    }

    /// Drop every pending action
    pub fn clear_all(&self) -> Result<()> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.store.remove(&self.key)?;
        tracing::info!("Cleared offline queue '{}'", self.key);
        Ok(())
    }

    fn load(&self) -> Result<Vec<QueuedAction>> {
        match self.store.read(&self.key)? {
            Some(raw) => codec::decode_actions(&raw),
            None => Ok(Vec::new()),
        }
    }

    fn save(&self, actions: &[QueuedAction]) -> Result<()> {
        if actions.is_empty() {
            return self.store.remove(&self.key);
        }
        let encoded = codec::encode_actions(actions)?;
        self.store.write(&self.key, &encoded)
    }
}
