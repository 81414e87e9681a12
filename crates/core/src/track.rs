// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tracks which keys are currently failing to reconcile

use dashmap::DashSet;
use std::hash::Hash;

/// Concurrent set of keys in error
pub struct ErrorTracker<K = String> {
    keys: DashSet<K>,
}

impl<K> ErrorTracker<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            keys: DashSet::new(),
        }
    }

    /// Whether `key` is currently in error
    pub fn load(&self, key: &K) -> bool {
        self.keys.contains(key)
    }

    /// Mark `key` as in error, returning true if it was not already
    pub fn store(&self, key: K) -> bool {
        self.keys.insert(key)
    }

    /// Clear `key`, returning true if it was in error
    pub fn delete(&self, key: &K) -> bool {
        self.keys.remove(key).is_some()
    }

    pub fn count(&self) -> usize {
        self.keys.len()
    }

    /// Keys currently in error, in no particular order
    pub fn keys(&self) -> Vec<K> {
        self.keys.iter().map(|key| key.key().clone()).collect()
    }
}

impl<K> Default for ErrorTracker<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> std::fmt::Debug for ErrorTracker<K>
where
    K: Eq + Hash + std::fmt::Debug,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorTracker")
            .field("count", &self.keys.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "track_tests.rs"]
mod tests;
