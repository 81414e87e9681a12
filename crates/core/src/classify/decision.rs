// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure decision table mapping observed vs. cached state to an outcome

use super::EventKind;

/// Facts gathered for one key before deciding
///
/// Validity and the deletion marker only count for objects that were found;
/// `Observation::new` clears them otherwise.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Observation {
    /// The source returned an object (`okGet`)
    pub found: bool,
    /// The cache held an object (`okCache`)
    pub cached: bool,
    pub found_valid: bool,
    pub cached_valid: bool,
    /// The fetched object is flagged for removal
    pub deletion_marked: bool,
}

impl Observation {
    pub fn new(
        found: bool,
        cached: bool,
        found_valid: bool,
        cached_valid: bool,
        deletion_marked: bool,
    ) -> Self {
        Self {
            found,
            cached,
            found_valid: found && found_valid,
            cached_valid: cached && cached_valid,
            deletion_marked: found && deletion_marked,
        }
    }
}

/// What to emit and how the cache changes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// No event, cache untouched
    Ignore,
    /// Delete carrying the cached object; cache entry removed
    DeleteCached,
    /// Delete carrying the fetched object; cache entry removed
    DeleteObserved,
    /// Create carrying the fetched object; cache set to it
    Create,
    /// Sync carrying fetched and cached objects; cache set to the fetched one
    Sync,
}

impl Decision {
    pub fn event_kind(self) -> Option<EventKind> {
        match self {
            Decision::Ignore => None,
            Decision::DeleteCached | Decision::DeleteObserved => Some(EventKind::Delete),
            Decision::Create => Some(EventKind::Create),
            Decision::Sync => Some(EventKind::Sync),
        }
    }
}

/// Evaluate the decision table; the first matching rule wins
pub fn decide(obs: Observation) -> Decision {
    match obs {
        // Gone from the source entirely
        Observation {
            cached: true,
            found: false,
            ..
        } => Decision::DeleteCached,
        // Marked for removal wins over any validity
        Observation {
            found: true,
            deletion_marked: true,
            ..
        } => Decision::DeleteObserved,
        Observation {
            cached: false,
            found: true,
            found_valid: true,
            ..
        } => Decision::Create,
        // Invalid newcomer, or nothing anywhere
        Observation { cached: false, .. } => Decision::Ignore,
        // Both present from here on
        Observation {
            found_valid: false,
            cached_valid: false,
            ..
        } => Decision::Ignore,
        Observation {
            found_valid: false,
            ..
        } => Decision::DeleteCached,
        Observation {
            cached_valid: false,
            ..
        } => Decision::Create,
        _ => Decision::Sync,
    }
}

#[cfg(test)]
#[path = "decision_tests.rs"]
mod tests;
