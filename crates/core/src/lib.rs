// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rk-core: building blocks for event-driven reconciliation controllers
//!
//! This crate provides:
//! - A keyed reader/writer lock over an open-ended key space
//! - A state classifier that turns observed vs. cached state into
//!   Create / Delete / Sync events, serialized per key
//! - The requeue error taxonomy used to drive reconcile retries
//! - A concurrent tracker for keys currently in error

pub mod classify;
pub mod id;
pub mod key;
pub mod keyed_lock;
pub mod requeue;
pub mod track;

pub use classify::{decide, Decision, Event, EventKind, Observation, StateClassifier};
pub use id::{IdGen, LogId, SequentialIdGen, UuidIdGen};
pub use key::{ClassifyKey, ObjectKey};
pub use keyed_lock::{KeyReadGuard, KeyWriteGuard, KeyedLock, LockRetention};
pub use requeue::{handle_reconcile_result, ReconcileAction, ReconcileError, RequeueError};
pub use track::ErrorTracker;
