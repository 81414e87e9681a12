// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconcile outcomes and requeue handling
//!
//! Reconcilers signal expected, retryable conditions (a dependency that is
//! not ready yet, say) with a [`RequeueError`] instead of a hard failure, so
//! the controller requeues the key without treating it as an error.

use std::time::Duration;
use thiserror::Error;
use tracing::info;

/// Instructs the controller how to requeue a key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequeueError {
    /// Requeue immediately
    #[error("requeue needed: {reason}")]
    NeedRequeue { reason: String },
    /// Requeue once `after` has elapsed
    #[error("requeue needed after {after:?}: {reason}")]
    NeedRequeueAfter { reason: String, after: Duration },
    /// Stop processing this key until its next event
    #[error("no need to requeue: {reason}")]
    NoNeedRequeue { reason: String },
}

impl RequeueError {
    pub fn need_requeue(reason: impl Into<String>) -> Self {
        RequeueError::NeedRequeue {
            reason: reason.into(),
        }
    }

    pub fn need_requeue_after(reason: impl Into<String>, after: Duration) -> Self {
        RequeueError::NeedRequeueAfter {
            reason: reason.into(),
            after,
        }
    }

    pub fn no_need_requeue(reason: impl Into<String>) -> Self {
        RequeueError::NoNeedRequeue {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            RequeueError::NeedRequeue { reason }
            | RequeueError::NeedRequeueAfter { reason, .. }
            | RequeueError::NoNeedRequeue { reason } => reason,
        }
    }

    /// Delay before requeueing, if any
    pub fn duration(&self) -> Option<Duration> {
        match self {
            RequeueError::NeedRequeueAfter { after, .. } => Some(*after),
            _ => None,
        }
    }
}

/// Error returned by a reconcile pass
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Requeue(#[from] RequeueError),
    #[error("{0}")]
    Failed(Box<dyn std::error::Error + Send + Sync>),
}

impl ReconcileError {
    pub fn failed(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        ReconcileError::Failed(err.into())
    }

    /// Build a failure from a plain message
    pub fn msg(message: impl Into<String>) -> Self {
        let message: String = message.into();
        ReconcileError::Failed(message.into())
    }
}

/// What the controller does with a key after a reconcile pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Nothing more to do until the next event
    Done,
    /// Requeue immediately
    Requeue,
    /// Requeue after a delay
    RequeueAfter(Duration),
    /// Unexpected failure; requeue with the error back-off
    Retry { error: String },
}

impl ReconcileAction {
    pub fn is_error(&self) -> bool {
        matches!(self, ReconcileAction::Retry { .. })
    }
}

/// Map a reconcile result to the controller's next step
pub fn handle_reconcile_result(result: Result<(), ReconcileError>) -> ReconcileAction {
    let err = match result {
        Ok(()) => return ReconcileAction::Done,
        Err(err) => err,
    };

    match err {
        ReconcileError::Requeue(RequeueError::NeedRequeueAfter { reason, after }) => {
            info!(?after, %reason, "requeue after duration");
            ReconcileAction::RequeueAfter(after)
        }
        ReconcileError::Requeue(RequeueError::NeedRequeue { reason }) => {
            info!(%reason, "requeue immediately");
            ReconcileAction::Requeue
        }
        ReconcileError::Requeue(RequeueError::NoNeedRequeue { reason }) => {
            info!(%reason, "no need to requeue");
            ReconcileAction::Done
        }
        ReconcileError::Failed(err) => {
            info!(error = %err, "requeue with error back-off");
            ReconcileAction::Retry {
                error: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
#[path = "requeue_tests.rs"]
mod tests;
