//! Per-key async locks.
//!
//! Requests touching the same visitor are serialized; requests for different
//! visitors never contend on the same mutex. Slots are dropped from the map once
//! nobody holds or waits on them.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type Slot = Arc<Mutex<()>>;

pub struct KeyedLocks<K: Eq + Hash + Clone> {
    slots: Arc<DashMap<K, Slot>>,
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            slots: Arc::new(DashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn acquire(&self, key: K) -> KeyGuard<K> {
        let slot = self
            .slots
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = slot.lock_owned().await;
        KeyGuard {
            key,
            slots: Arc::clone(&self.slots),
            guard: Some(guard),
        }
    }

    /// Number of keys currently held or awaited.
    pub fn active_keys(&self) -> usize {
        self.slots.len()
    }
}

/// Exclusive access to one key; released on drop.
pub struct KeyGuard<K: Eq + Hash + Clone> {
    key: K,
    slots: Arc<DashMap<K, Slot>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K: Eq + Hash + Clone> Drop for KeyGuard<K> {
    fn drop(&mut self) {
        self.guard.take();
        // Only the map's own handle left means no holder and no waiter.
        self.slots
            .remove_if(&self.key, |_, slot| Arc::strong_count(slot) == 1);
    }
}
