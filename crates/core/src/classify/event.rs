// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Classified change events

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of change detected for a key
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    Create,
    Delete,
    Sync,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Create => "CREATE",
            EventKind::Delete => "DELETE",
            EventKind::Sync => "SYNC",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one classification
///
/// "Nothing happened" is expressed as `Option::None` by the classifier, never
/// as an event without data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Event<T> {
    /// A valid object appeared that was not cached (or was cached as invalid)
    Create { current: T },
    /// The object disappeared, became invalid, or is marked for deletion.
    /// `current` is the last known object.
    Delete { current: T },
    /// A valid object is still present; `previous` is the cached baseline
    Sync { current: T, previous: T },
}

impl<T> Event<T> {
    pub fn kind(&self) -> EventKind {
        match self {
            Event::Create { .. } => EventKind::Create,
            Event::Delete { .. } => EventKind::Delete,
            Event::Sync { .. } => EventKind::Sync,
        }
    }

    pub fn current(&self) -> &T {
        match self {
            Event::Create { current } | Event::Delete { current } | Event::Sync { current, .. } => {
                current
            }
        }
    }

    /// Cached object a Sync was computed against
    pub fn previous(&self) -> Option<&T> {
        match self {
            Event::Sync { previous, .. } => Some(previous),
            _ => None,
        }
    }

    pub fn into_current(self) -> T {
        match self {
            Event::Create { current } | Event::Delete { current } | Event::Sync { current, .. } => {
                current
            }
        }
    }
}
