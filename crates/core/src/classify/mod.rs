// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State classification
//!
//! `StateClassifier` compares what a source currently reports for a key with
//! the last object it accepted for that key, and turns the difference into a
//! Create, Delete or Sync event. All work for one key (fetch, compare, cache
//! update) runs under that key's exclusive lock, so callers for the same key
//! see a linear history while callers for other keys proceed in parallel.

mod decision;
mod event;

pub use decision::{decide, Decision, Observation};
pub use event::{Event, EventKind};

use crate::key::ClassifyKey;
use crate::keyed_lock::{KeyedLock, LockRetention};
use dashmap::DashMap;

type FetchFn<K, T> = Box<dyn Fn(&K) -> Option<T> + Send + Sync>;
type ValidFn<T> = Box<dyn Fn(Option<&T>) -> bool + Send + Sync>;
type MarkerFn<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Classifies external state changes per key
pub struct StateClassifier<K, T> {
    locks: KeyedLock<K>,
    /// Last accepted object per key; only touched under the key's write lock
    cache: DashMap<K, T>,
    fetch: FetchFn<K, T>,
    is_valid: ValidFn<T>,
    has_deletion_marker: MarkerFn<T>,
}

impl<K, T> StateClassifier<K, T>
where
    K: ClassifyKey,
    T: Clone,
{
    /// Create a classifier from its collaborators
    ///
    /// - `fetch` returns the current object, or `None` when it is absent or
    ///   could not be retrieved. It may block; it runs under the key's lock.
    /// - `is_valid` must return `false` for `None`.
    /// - `has_deletion_marker` flags found objects pending removal.
    pub fn new<F, V, M>(fetch: F, is_valid: V, has_deletion_marker: M) -> Self
    where
        F: Fn(&K) -> Option<T> + Send + Sync + 'static,
        V: Fn(Option<&T>) -> bool + Send + Sync + 'static,
        M: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            locks: KeyedLock::new(),
            cache: DashMap::new(),
            fetch: Box::new(fetch),
            is_valid: Box::new(is_valid),
            has_deletion_marker: Box::new(has_deletion_marker),
        }
    }

    pub fn with_lock_retention(mut self, retention: LockRetention) -> Self {
        self.locks = KeyedLock::with_retention(retention);
        self
    }

    /// Classify the current state of `key`
    ///
    /// Returns `None` when no event should fire. Any returned event has
    /// already been committed to the cache.
    pub fn classify(&self, key: &K) -> Option<Event<T>> {
        if key.is_empty_key() {
            tracing::error!("classify: received empty key");
            return None;
        }

        let _guard = self.locks.write(key);

        let fetched = (self.fetch)(key);
        let cached = self.cache.get(key).map(|entry| entry.value().clone());

        let obs = Observation::new(
            fetched.is_some(),
            cached.is_some(),
            (self.is_valid)(fetched.as_ref()),
            (self.is_valid)(cached.as_ref()),
            fetched
                .as_ref()
                .is_some_and(|obj| (self.has_deletion_marker)(obj)),
        );
        let decision = decide(obs);

        tracing::debug!(
            ?key,
            ok_get = obs.found,
            get_valid = obs.found_valid,
            ok_cache = obs.cached,
            cache_valid = obs.cached_valid,
            deletion_marked = obs.deletion_marked,
            ?decision,
            "classified"
        );

        match (decision, fetched, cached) {
            (Decision::DeleteCached, _, Some(previous)) => {
                self.cache.remove(key);
                Some(Event::Delete { current: previous })
            }
            (Decision::DeleteObserved, Some(current), _) => {
                self.cache.remove(key);
                Some(Event::Delete { current })
            }
            (Decision::Create, Some(current), _) => {
                self.cache.insert(key.clone(), current.clone());
                Some(Event::Create { current })
            }
            (Decision::Sync, Some(current), Some(previous)) => {
                self.cache.insert(key.clone(), current.clone());
                Some(Event::Sync { current, previous })
            }
            _ => None,
        }
    }

    /// Snapshot of the cached object for `key`
    ///
    /// Takes the key's shared lock so it never observes a classification
    /// midway.
    pub fn cached(&self, key: &K) -> Option<T> {
        if key.is_empty_key() {
            return None;
        }
        let _guard = self.locks.read(key);
        self.cache.get(key).map(|entry| entry.value().clone())
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Number of keys with an entry in the lock table
    pub fn lock_table_len(&self) -> usize {
        self.locks.len()
    }
}

impl<K, T> std::fmt::Debug for StateClassifier<K, T>
where
    K: ClassifyKey,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateClassifier")
            .field("locks", &self.locks)
            .field("cached", &self.cache.len())
            .finish()
    }
}

#[cfg(test)]
#[path = "classifier_tests.rs"]
mod tests;
