// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-key reader/writer locking over an open-ended key space
//!
//! `KeyedLock` behaves like "one `RwLock` per key" without allocating locks up
//! front. Entries are created lazily with an atomic insert-if-absent on a
//! sharded map, so callers racing on a fresh key always end up waiting on the
//! same entry, and callers on different keys never contend beyond the brief
//! shard access.
//!
//! Two retention policies are available:
//! - **Retain** (default) - entries live for the lifetime of the lock table.
//!   Memory grows with the number of distinct keys ever locked.
//! - **Reclaim** - entries are removed once nobody holds or waits on them.
//!   Each entry carries a reference count that is only incremented while the
//!   shard is write-locked by the insert-if-absent, and only decremented inside
//!   `remove_if`, so an entry can never be dropped between a caller fetching it
//!   and that caller locking it.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};

/// What happens to a key's entry once its last holder releases it
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LockRetention {
    /// Keep every entry for the lifetime of the table
    #[default]
    Retain,
    /// Drop an entry once no caller holds or waits on it
    Reclaim,
}

#[derive(Debug, Default)]
struct HoldState {
    readers: usize,
    writer: bool,
    waiting_writers: usize,
}

/// Lock entry for a single key
#[derive(Debug, Default)]
struct KeySlot {
    state: Mutex<HoldState>,
    changed: Condvar,
    /// Callers holding or waiting on this slot (maintained under `Reclaim` only)
    refs: AtomicUsize,
}

impl KeySlot {
    fn acquire_write(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.waiting_writers += 1;
        while state.writer || state.readers > 0 {
            state = self.changed.wait(state).unwrap_or_else(|e| e.into_inner());
        }
        state.waiting_writers -= 1;
        state.writer = true;
    }

    fn release_write(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if !state.writer {
            return false;
        }
        state.writer = false;
        drop(state);
        self.changed.notify_all();
        true
    }

    fn acquire_read(&self) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        // Waiting writers go first so a steady stream of readers cannot starve them
        while state.writer || state.waiting_writers > 0 {
            state = self.changed.wait(state).unwrap_or_else(|e| e.into_inner());
        }
        state.readers += 1;
    }

    fn release_read(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.readers == 0 {
            return false;
        }
        state.readers -= 1;
        let last = state.readers == 0;
        drop(state);
        if last {
            self.changed.notify_all();
        }
        true
    }
}

/// Advisory reader/writer lock keyed by an arbitrary hashable value
///
/// Keys never need to be registered; the first `lock`/`rlock` on a key creates
/// its entry. Blocking calls never fail and have no timeout.
pub struct KeyedLock<K> {
    slots: DashMap<K, Arc<KeySlot>>,
    retention: LockRetention,
}

impl<K> KeyedLock<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::with_retention(LockRetention::default())
    }

    pub fn with_retention(retention: LockRetention) -> Self {
        Self {
            slots: DashMap::new(),
            retention,
        }
    }

    pub fn retention(&self) -> LockRetention {
        self.retention
    }

    /// Block until the caller is the sole exclusive holder of `key`
    pub fn lock(&self, key: &K) {
        self.checkout(key).acquire_write();
    }

    /// Release the exclusive hold on `key`
    ///
    /// Returns `false` when `key` was not exclusively held. An unmatched unlock
    /// is a caller error but is otherwise ignored.
    pub fn unlock(&self, key: &K) -> bool {
        let Some(slot) = self.lookup(key) else {
            return false;
        };
        let released = slot.release_write();
        if released {
            self.checkin(key);
        }
        released
    }

    /// Block until the caller holds `key` shared with other readers only
    pub fn rlock(&self, key: &K) {
        self.checkout(key).acquire_read();
    }

    /// Release one shared hold on `key`
    ///
    /// Returns `false` when no reader held `key`.
    pub fn runlock(&self, key: &K) -> bool {
        let Some(slot) = self.lookup(key) else {
            return false;
        };
        let released = slot.release_read();
        if released {
            self.checkin(key);
        }
        released
    }

    /// Exclusive hold on `key`, released when the guard drops
    pub fn write(&self, key: &K) -> KeyWriteGuard<'_, K> {
        let slot = self.checkout(key);
        slot.acquire_write();
        KeyWriteGuard {
            table: self,
            key: key.clone(),
            slot,
        }
    }

    /// Shared hold on `key`, released when the guard drops
    pub fn read(&self, key: &K) -> KeyReadGuard<'_, K> {
        let slot = self.checkout(key);
        slot.acquire_read();
        KeyReadGuard {
            table: self,
            key: key.clone(),
            slot,
        }
    }

    /// Number of keys with a live entry
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.slots.contains_key(key)
    }

    /// Fetch or create the entry for `key`, registering the caller as a user
    fn checkout(&self, key: &K) -> Arc<KeySlot> {
        let slot = self.slots.entry(key.clone()).or_default();
        if self.retention == LockRetention::Reclaim {
            // Still under the shard write lock taken by `entry`
            slot.refs.fetch_add(1, Ordering::AcqRel);
        }
        Arc::clone(slot.value())
    }

    fn lookup(&self, key: &K) -> Option<Arc<KeySlot>> {
        self.slots.get(key).map(|slot| Arc::clone(slot.value()))
    }

    /// Drop the caller's registration, removing the entry if it was the last
    fn checkin(&self, key: &K) {
        if self.retention == LockRetention::Retain {
            return;
        }
        self.slots
            .remove_if(key, |_, slot| slot.refs.fetch_sub(1, Ordering::AcqRel) == 1);
    }
}

impl<K> Default for KeyedLock<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> std::fmt::Debug for KeyedLock<K>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedLock")
            .field("retention", &self.retention)
            .field("keys", &self.slots.len())
            .finish()
    }
}

/// Exclusive hold on one key of a [`KeyedLock`]
#[must_use = "the key is unlocked as soon as the guard is dropped"]
pub struct KeyWriteGuard<'a, K>
where
    K: Eq + Hash + Clone,
{
    table: &'a KeyedLock<K>,
    key: K,
    slot: Arc<KeySlot>,
}

impl<K> KeyWriteGuard<'_, K>
where
    K: Eq + Hash + Clone,
{
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K> Drop for KeyWriteGuard<'_, K>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        // An unmatched `unlock` may already have released this hold
        if self.slot.release_write() {
            self.table.checkin(&self.key);
        }
    }
}

/// Shared hold on one key of a [`KeyedLock`]
#[must_use = "the key is unlocked as soon as the guard is dropped"]
pub struct KeyReadGuard<'a, K>
where
    K: Eq + Hash + Clone,
{
    table: &'a KeyedLock<K>,
    key: K,
    slot: Arc<KeySlot>,
}

impl<K> KeyReadGuard<'_, K>
where
    K: Eq + Hash + Clone,
{
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K> Drop for KeyReadGuard<'_, K>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        if self.slot.release_read() {
            self.table.checkin(&self.key);
        }
    }
}

#[cfg(test)]
#[path = "keyed_lock_tests.rs"]
mod tests;
