//! Pending action queue
//!
//! Append-only buffer of actions waiting to be submitted to the host.
//! Insertion order is application order; nothing is reordered or
//! deduplicated.

use crate::action::Action;
use parking_lot::Mutex;

/// Ordered buffer of pending actions
#[derive(Debug, Default)]
pub struct ActionQueue {
    pending: Mutex<Vec<Action>>,
}

impl ActionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action to the tail
    pub fn enqueue(&self, action: Action) {
        log::trace!("Queued {} on {}", action.verb(), action.table());
        self.pending.lock().push(action);
    }

    /// Append several actions, keeping their order
    pub fn extend<I: IntoIterator<Item = Action>>(&self, actions: I) {
        self.pending.lock().extend(actions);
    }

    /// Independent copy of the current contents
    pub fn snapshot(&self) -> Vec<Action> {
        self.pending.lock().clone()
    }

    /// Take the current contents and leave the queue empty
    ///
    /// The swap happens under a single lock acquisition, so anything
    /// enqueued while the caller processes the batch lands in the next one.
    pub fn flush_and_clear(&self) -> Vec<Action> {
        let batch = std::mem::take(&mut *self.pending.lock());
        log::debug!("Flushed {} pending action(s)", batch.len());
        batch
    }

    /// Drop every pending action
    pub fn clear(&self) {
        self.pending.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.lock().is_empty()
    }
}
