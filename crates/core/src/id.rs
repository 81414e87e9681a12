// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Short ids correlating the log lines of one reconcile pass

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Hex digits in a [`LogId`]
pub const LOG_ID_LEN: usize = 8;

/// Fixed-width lowercase hex id
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LogId(String);

impl LogId {
    fn from_u32(value: u32) -> Self {
        LogId(format!("{value:0width$x}", width = LOG_ID_LEN))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of [`LogId`]s
pub trait IdGen: Send + Sync {
    fn next(&self) -> LogId;
}

/// Random ids taken from the leading bytes of a v4 uuid
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidIdGen;

impl IdGen for UuidIdGen {
    fn next(&self) -> LogId {
        let bytes = uuid::Uuid::new_v4().into_bytes();
        LogId::from_u32(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }
}

/// Counter-backed ids in the same format, shared between clones
#[derive(Clone, Debug, Default)]
pub struct SequentialIdGen {
    issued: Arc<AtomicU32>,
}

impl IdGen for SequentialIdGen {
    fn next(&self) -> LogId {
        let n = self.issued.fetch_add(1, Ordering::SeqCst).wrapping_add(1);
        LogId::from_u32(n)
    }
}

#[cfg(test)]
#[path = "id_tests.rs"]
mod tests;
