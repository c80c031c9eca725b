//! Per-aggregate async locks.
//!
//! Every read-compute-write sequence holds the locks of the aggregates it
//! touches. Keys are always acquired in [`LockKey`] order (wars, then nation
//! pairs, then nations sorted by id) so two callers never wait on each other
//! in opposite orders.
//!
//! Entries exist only while some operation holds or waits on them; releasing
//! the last [`LockSet`] that used a key removes it from the table.

use nation_wars_core::NationId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// An aggregate that can be locked.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LockKey {
    War(String),
    /// An unordered nation pair; build with [`LockKey::pair`].
    Pair(NationId, NationId),
    Nation(NationId),
}

impl LockKey {
    pub fn war(id: impl Into<String>) -> Self {
        LockKey::War(id.into())
    }

    pub fn nation(id: impl Into<NationId>) -> Self {
        LockKey::Nation(id.into())
    }

    pub fn pair(a: impl Into<NationId>, b: impl Into<NationId>) -> Self {
        let (a, b) = (a.into(), b.into());
        if a <= b {
            LockKey::Pair(a, b)
        } else {
            LockKey::Pair(b, a)
        }
    }
}

type LockMap = HashMap<LockKey, Arc<AsyncMutex<()>>>;

/// Guards held for the duration of one operation.
pub struct LockSet<'a> {
    table: &'a LockTable,
    keys: Vec<LockKey>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl Drop for LockSet<'_> {
    fn drop(&mut self) {
        self.guards.clear();
        let mut locks = self.table.map();
        for key in &self.keys {
            // The table's own handle is the only one left once nobody holds
            // or awaits the key. Handles are only cloned under this map lock.
            if locks.get(key).is_some_and(|m| Arc::strong_count(m) == 1) {
                locks.remove(key);
            }
        }
    }
}

/// Table of named async mutexes, created on first use.
#[derive(Default)]
pub struct LockTable {
    locks: Mutex<LockMap>,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, LockMap> {
        // A poisoned table only means another thread panicked mid-insert;
        // the map itself is still usable.
        self.locks.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn handle(&self, key: &LockKey) -> Arc<AsyncMutex<()>> {
        Arc::clone(self.map().entry(key.clone()).or_default())
    }

    /// Acquire every key in canonical order. Duplicates are locked once.
    pub async fn acquire(&self, keys: impl IntoIterator<Item = LockKey>) -> LockSet<'_> {
        let mut keys: Vec<LockKey> = keys.into_iter().collect();
        keys.sort();
        keys.dedup();

        let mut set = LockSet {
            table: self,
            guards: Vec::with_capacity(keys.len()),
            keys: Vec::with_capacity(keys.len()),
        };
        for key in keys {
            let handle = self.handle(&key);
            set.keys.push(key);
            set.guards.push(handle.lock_owned().await);
        }
        set
    }

    /// Number of keys currently held or awaited.
    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
