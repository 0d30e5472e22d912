//! Optimistic message timeline
//!
//! Outgoing items are shown immediately as pending under a local tag and
//! later committed with the server's copy, or marked failed.

use std::fmt;
use std::sync::Arc;

/// Delivery state of a timeline entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    Pending,
    Committed,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry<T> {
    pub local_id: u64,
    pub item: T,
    pub delivery: Delivery,
}

/// Server identity of an item, `None` for items the server has not seen
pub type ServerIdFn<T> = Arc<dyn Fn(&T) -> Option<String> + Send + Sync>;

pub struct Timeline<T> {
    entries: Vec<TimelineEntry<T>>,
    next_local_id: u64,
    id_of: ServerIdFn<T>,
}

impl<T> fmt::Debug for Timeline<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeline")
            .field("entries", &self.entries.len())
            .field("next_local_id", &self.next_local_id)
            .finish()
    }
}

impl<T> Timeline<T> {
    pub fn new<F>(id_of: F) -> Self
    where
        F: Fn(&T) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            entries: Vec::new(),
            next_local_id: 1,
            id_of: Arc::new(id_of),
        }
    }

    pub fn entries(&self) -> &[TimelineEntry<T>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Show an item before the server has confirmed it
    pub fn push_pending(&mut self, item: T) -> u64 {
        let local_id = self.allocate();
        self.entries.push(TimelineEntry {
            local_id,
            item,
            delivery: Delivery::Pending,
        });
        local_id
    }

    /// Swap the pending entry for the server's copy
    pub fn commit(&mut self, local_id: u64, confirmed: T) {
        let pending = self.position(local_id);
        let existing = (self.id_of)(&confirmed).and_then(|id| {
            self.entries.iter().position(|e| {
                e.local_id != local_id && (self.id_of)(&e.item).as_deref() == Some(id.as_str())
            })
        });

        match (existing, pending) {
            (Some(at), pending) => {
                // Already delivered by another path (refetch, push); collapse to one entry
                self.entries[at].item = confirmed;
                self.entries[at].delivery = Delivery::Committed;
                if let Some(pending) = pending {
                    self.entries.remove(pending);
                }
            }
            (None, Some(at)) => {
                self.entries[at].item = confirmed;
                self.entries[at].delivery = Delivery::Committed;
            }
            (None, None) => {
                tracing::debug!("Commit for unknown local entry {}, appending", local_id);
                let local_id = self.allocate();
                self.entries.push(TimelineEntry {
                    local_id,
                    item: confirmed,
                    delivery: Delivery::Committed,
                });
            }
        }
    }

    /// Mark a pending entry as failed. Returns false if it is not pending.
    pub fn fail(&mut self, local_id: u64, reason: impl Into<String>) -> bool {
        match self.entries.iter_mut().find(|e| e.local_id == local_id) {
            Some(entry) if entry.delivery == Delivery::Pending => {
                let reason = reason.into();
                tracing::warn!("Delivery of entry {} failed: {}", local_id, reason);
                entry.delivery = Delivery::Failed(reason);
                true
            }
            _ => false,
        }
    }

    /// Drop an entry, typically a failed one the user dismissed
    pub fn discard(&mut self, local_id: u64) -> Option<T> {
        let at = self.position(local_id)?;
        Some(self.entries.remove(at).item)
    }

    /// Add or replace an item that arrived from the server
    pub fn receive(&mut self, item: T) {
        let existing = (self.id_of)(&item).and_then(|id| {
            self.entries
                .iter()
                .position(|e| (self.id_of)(&e.item).as_deref() == Some(id.as_str()))
        });
        match existing {
            Some(at) => {
                self.entries[at].item = item;
                self.entries[at].delivery = Delivery::Committed;
            }
            None => {
                let local_id = self.allocate();
                self.entries.push(TimelineEntry {
                    local_id,
                    item,
                    delivery: Delivery::Committed,
                });
            }
        }
    }

    fn position(&self, local_id: u64) -> Option<usize> {
        self.entries.iter().position(|e| e.local_id == local_id)
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_local_id;
        self.next_local_id += 1;
        id
    }
}
