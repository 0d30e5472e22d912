//! Selection-by-id that survives restarts
//!
//! Only the identifier is stored. The selected value itself is re-resolved
//! from whatever candidate list the caller currently holds, so a refetched
//! list swaps in fresh data without changing which item is selected.

use std::fmt;
use std::sync::Arc;

use crate::storage::{read_key, remove_key, write_key, KeyValueStore};

/// Caller-supplied identifier extraction
pub type IdFn<T> = Arc<dyn Fn(&T) -> String + Send + Sync>;

/// The currently open item of some list, persisted by id
pub struct PersistedSelection<T> {
    key: String,
    storage: Arc<dyn KeyValueStore>,
    id_of: IdFn<T>,
    stored_id: Option<String>,
    selected: Option<T>,
}

impl<T> fmt::Debug for PersistedSelection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistedSelection")
            .field("key", &self.key)
            .field("stored_id", &self.stored_id)
            .field("has_selection", &self.selected.is_some())
            .finish()
    }
}

impl<T: Clone + PartialEq> PersistedSelection<T> {
    /// Open the selection stored under `key`. Nothing is selected until
    /// [`restore`](Self::restore) sees a candidate list.
    pub fn new<I, F>(storage: Arc<dyn KeyValueStore>, key: impl Into<String>, id_of: F) -> Self
    where
        T: 'static,
        F: Fn(&T) -> I + Send + Sync + 'static,
        I: ToString,
    {
        let key = key.into();
        let stored_id = read_key(storage.as_ref(), &key);
        tracing::debug!("Opened selection '{}' (stored id {:?})", key, stored_id);
        Self {
            key,
            storage,
            id_of: Arc::new(move |item: &T| id_of(item).to_string()),
            stored_id,
            selected: None,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn selected(&self) -> Option<&T> {
        self.selected.as_ref()
    }

    pub fn stored_id(&self) -> Option<&str> {
        self.stored_id.as_deref()
    }

    /// Re-resolve the stored id against a new candidate list
    pub fn restore(&mut self, candidates: &[T]) {
        // An empty list is usually a refetch in flight; keep what we have
        if candidates.is_empty() {
            return;
        }
        let Some(stored) = self.stored_id.as_deref() else {
            return;
        };

        let found = candidates.iter().find(|c| (self.id_of)(*c) == stored);
        let holds_stored = self
            .selected
            .as_ref()
            .is_some_and(|held| (self.id_of)(held) == stored);

        match (found, holds_stored) {
            (Some(fresh), true) => {
                if self.selected.as_ref() != Some(fresh) {
                    tracing::debug!("Selection '{}' refreshed for id {}", self.key, stored);
                    self.selected = Some(fresh.clone());
                }
            }
            (Some(item), false) => {
                tracing::debug!("Selection '{}' restored to id {}", self.key, stored);
                self.selected = Some(item.clone());
            }
            (None, _) => {
                if self.selected.take().is_some() {
                    tracing::debug!(
                        "Selection '{}' id {} no longer listed, surfaced as unset",
                        self.key,
                        stored
                    );
                }
            }
        }
    }

    /// Select an item, or clear the selection with `None`
    pub fn select(&mut self, item: Option<T>) {
        match &item {
            Some(value) => {
                let id = (self.id_of)(value);
                write_key(self.storage.as_ref(), &self.key, &id);
                self.stored_id = Some(id);
            }
            None => {
                remove_key(self.storage.as_ref(), &self.key);
                self.stored_id = None;
            }
        }
        self.selected = item;
    }

    /// Derive the new selection from the current one (toggle patterns)
    pub fn select_with<F>(&mut self, update: F)
    where
        F: FnOnce(Option<&T>) -> Option<T>,
    {
        let next = update(self.selected.as_ref());
        self.select(next);
    }
}
