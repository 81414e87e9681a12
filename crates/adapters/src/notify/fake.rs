// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake notification adapter for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{Notification, NotifyAdapter, NotifyError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct FakeState {
    delivered: Vec<Notification>,
    attempts: usize,
    failures_left: usize,
}

/// Fake notification adapter that records deliveries and can inject failures
#[derive(Clone, Default)]
pub struct FakeNotifyAdapter {
    state: Arc<Mutex<FakeState>>,
}

impl FakeNotifyAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `count` sends
    pub fn fail_next(&self, count: usize) {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).failures_left = count;
    }

    /// Notifications delivered successfully
    pub fn delivered(&self) -> Vec<Notification> {
        self.state
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .delivered
            .clone()
    }

    /// Every send call, failed or not
    pub fn attempts(&self) -> usize {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).attempts
    }
}

#[async_trait]
impl NotifyAdapter for FakeNotifyAdapter {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.attempts += 1;
        if state.failures_left > 0 {
            state.failures_left -= 1;
            return Err(NotifyError::Failed("injected failure".to_string()));
        }
        state.delivered.push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
