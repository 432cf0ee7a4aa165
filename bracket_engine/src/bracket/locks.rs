//! Per-competition mutual exclusion for bracket writes.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::models::CompetitionKey;

/// Async lock table keyed by competition.
///
/// Operations on different competitions never wait on each other. Entries
/// nobody holds are pruned on the next acquire.
#[derive(Clone, Default)]
pub struct CompetitionLocks {
    locks: Arc<Mutex<HashMap<CompetitionKey, Arc<Mutex<()>>>>>,
}

impl CompetitionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`; released when the guard drops
    pub async fn acquire(&self, key: &CompetitionKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry(key.clone())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Number of competitions with a live lock entry
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
