// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Asynchronous alert delivery with retries

use crate::config::AlertConfig;
use crate::pool::{PoolError, Task, TaskHandle, WorkerPool};
use chrono::{FixedOffset, Utc};
use rk_adapters::{MessageBuilder, NotifyAdapter, Status};

/// Format of the `timestamp` field added to every alert
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Sends alerts through a [`NotifyAdapter`] on a retrying worker pool
///
/// `notify` never waits on delivery. Failed deliveries are retried with the
/// pool's backoff and logged once they give up.
pub struct Notifier<N> {
    adapter: N,
    builder: MessageBuilder,
    offset: FixedOffset,
    pool: WorkerPool,
}

impl<N: NotifyAdapter> Notifier<N> {
    /// Create a notifier and start its pool on the current tokio runtime
    pub fn new(adapter: N, builder: MessageBuilder, offset: FixedOffset, pool: WorkerPool) -> Self {
        pool.start();
        Self {
            adapter,
            builder,
            offset,
            pool,
        }
    }

    pub fn from_config(adapter: N, config: &AlertConfig) -> Self {
        Self::new(
            adapter,
            config.message_builder(),
            config.utc_offset(),
            WorkerPool::new(config.workers, config.backoff),
        )
    }

    /// Queue an alert for delivery
    ///
    /// The alert carries the builder's metadata, a `timestamp` field in the
    /// configured offset, then `fields`. Empty `content` is omitted.
    pub fn notify<I, K, V>(
        &self,
        status: Status,
        fields: I,
        content: impl Into<String>,
    ) -> Result<TaskHandle, PoolError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut notification = self
            .builder
            .notification(status)
            .with_field("timestamp", self.timestamp());
        for (key, value) in fields {
            notification = notification.with_field(key, value);
        }
        let notification = notification.with_content(content);

        let adapter = self.adapter.clone();
        self.pool.submit(Task::new(format!("notify-{}", status), move || {
            let adapter = adapter.clone();
            let notification = notification.clone();
            async move { adapter.send(&notification).await }
        }))
    }

    /// Current time rendered for the `timestamp` field
    pub fn timestamp(&self) -> String {
        Utc::now()
            .with_timezone(&self.offset)
            .format(TIMESTAMP_FORMAT)
            .to_string()
    }

    /// Wait for every queued alert to be delivered or given up on
    pub async fn flush(&self) {
        self.pool.wait().await;
    }

    /// Stop accepting alerts and drain the queue
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }

    pub fn adapter(&self) -> &N {
        &self.adapter
    }
}

impl<N> std::fmt::Debug for Notifier<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("title", &self.builder.title())
            .field("offset", &self.offset)
            .field("pool", &self.pool)
            .finish()
    }
}

#[cfg(test)]
#[path = "notifier_tests.rs"]
mod tests;
