// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification delivery

mod message;
mod noop;
mod webhook;

pub use message::{MessageBuilder, Notification, Status};
pub use noop::NoOpNotifyAdapter;
pub use webhook::WebhookNotifier;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeNotifyAdapter;

use async_trait::async_trait;
use thiserror::Error;

/// Errors from notification delivery
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotifyError {
    #[error("notification failed: {0}")]
    Failed(String),
    #[error("invalid proxy url {url}: {message}")]
    InvalidProxy { url: String, message: String },
}

/// Adapter for delivering notifications to external channels
#[async_trait]
pub trait NotifyAdapter: Clone + Send + Sync + 'static {
    /// Deliver a notification to every configured channel
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError>;
}
