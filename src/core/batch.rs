//! Pending-change buffer and its dedup set, handed to the flusher as one unit

use std::collections::HashSet;
use super::events::{DedupKey, PendingChange};

#[derive(Debug, Default)]
pub struct Batch {
    changes: Vec<PendingChange>,
    seen: HashSet<DedupKey>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a change unless the same (file, kind) pair is already queued.
    /// Returns `true` when the change was queued.
    pub fn push(&mut self, change: PendingChange) -> bool {
        if !self.seen.insert(change.dedup_key()) {
            return false;
        }
        self.changes.push(change);
        true
    }

    /// Detach the current contents, leaving an empty batch behind
    pub fn take(&mut self) -> Batch {
        std::mem::take(self)
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn dedup_len(&self) -> usize {
        self.seen.len()
    }

    pub fn into_changes(self) -> Vec<PendingChange> {
        self.changes
    }
}
