//! Per-conversation-key exclusion for turns.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per conversation key; a guard is held for a whole turn,
/// from checkpoint load to checkpoint save.
///
/// Entries live only while a turn holds or waits on the key: the last guard
/// to drop removes it.
#[derive(Default)]
pub struct ConversationLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Held for one turn. Releases the key on drop and forgets it when no other
/// turn is waiting.
pub struct ConversationGuard<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    key: String,
    held: Option<OwnedMutexGuard<()>>,
}

impl ConversationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other turn holds `key`.
    pub async fn acquire(&self, key: &str) -> ConversationGuard<'_> {
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        let held = lock.lock_owned().await;
        ConversationGuard {
            locks: &self.locks,
            key: key.to_string(),
            held: Some(held),
        }
    }

    /// Number of keys currently held or awaited.
    pub fn active(&self) -> usize {
        self.locks.len()
    }
}

impl Drop for ConversationGuard<'_> {
    fn drop(&mut self) {
        drop(self.held.take());
        // Waiters hold a clone of the Arc, so a count of one means only the map refers to it.
        self.locks
            .remove_if(&self.key, |_, lock| Arc::strong_count(lock) == 1);
    }
}
