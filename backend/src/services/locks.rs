//! Per-entry mutual exclusion inside one process

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Serializes engine operations on the same sample entry.
///
/// Across processes the store's compare-and-swap still decides the winner;
/// this only keeps one process from racing itself into `Conflict`.
#[derive(Clone, Default)]
pub struct EntryLocks {
    locks: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl EntryLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, entry_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            // Drop locks nobody holds or waits on
            locks.retain(|id, lock| *id == entry_id || Arc::strong_count(lock) > 1);
            locks.entry(entry_id).or_default().clone()
        };
        lock.lock_owned().await
    }

    pub async fn tracked(&self) -> usize {
        self.locks.lock().await.len()
    }
}
