// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded worker pool with retry and exponential backoff
//!
//! Tasks are queued on an unbounded channel and drained by a fixed number of
//! workers. A failing task is retried up to `max_retries` times, sleeping
//! between attempts with a delay that grows by `factor` each time. The final
//! outcome is reported through the [`TaskHandle`] returned by `submit`.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, Notify};
use tokio::task::JoinHandle;

/// Errors reported by the worker pool
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("worker pool is closed")]
    Closed,
    #[error("task {name} failed after {attempts} attempts: {error}")]
    TaskFailed {
        name: String,
        attempts: u32,
        error: String,
    },
    #[error("task {0} was dropped before it finished")]
    Dropped(String),
}

/// Retry schedule for failed tasks
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackoffConfig {
    /// Sleep before the first retry
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,
    pub max_retries: u32,
    /// Multiplier applied to the delay after each retry
    pub factor: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(100),
            max_retries: 3,
            factor: 2.0,
        }
    }
}

impl BackoffConfig {
    /// Total number of runs a task gets, including the first
    pub fn attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to sleep after `delay`, saturating instead of overflowing
    pub fn next_delay(&self, delay: Duration) -> Duration {
        Duration::try_from_secs_f64(delay.as_secs_f64() * self.factor).unwrap_or(delay)
    }
}

type BoxFuture = Pin<Box<dyn Future<Output = Result<(), String>> + Send>>;

/// A named, re-runnable unit of work
pub struct Task {
    name: String,
    run: Box<dyn FnMut() -> BoxFuture + Send>,
}

impl Task {
    /// Wrap a closure producing one attempt per call
    pub fn new<F, Fut, E>(name: impl Into<String>, mut attempt: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
        E: Display,
    {
        Self {
            name: name.into(),
            run: Box::new(move || {
                let fut = attempt();
                Box::pin(async move { fut.await.map_err(|e| e.to_string()) })
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task").field("name", &self.name).finish()
    }
}

/// Completion handle for a submitted task
#[derive(Debug)]
pub struct TaskHandle {
    name: String,
    done: oneshot::Receiver<Result<(), PoolError>>,
}

impl TaskHandle {
    /// Wait for the task's final outcome
    pub async fn result(self) -> Result<(), PoolError> {
        match self.done.await {
            Ok(result) => result,
            Err(_) => Err(PoolError::Dropped(self.name)),
        }
    }
}

struct Job {
    task: Task,
    done: oneshot::Sender<Result<(), PoolError>>,
}

/// Tracks submitted-but-unfinished jobs so `wait` can block until idle
#[derive(Default)]
struct Pending {
    count: AtomicUsize,
    idle: Notify,
}

impl Pending {
    fn add(&self) {
        self.count.fetch_add(1, Ordering::AcqRel);
    }

    fn finish(&self) {
        if self.count.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }

    async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.count.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Fixed-size pool of async workers
pub struct WorkerPool {
    concurrency: usize,
    backoff: BackoffConfig,
    tx: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Job>>>,
    pending: Arc<Pending>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    /// Create a pool; no worker runs until `start` is called
    ///
    /// A concurrency of zero is raised to one.
    pub fn new(concurrency: usize, backoff: BackoffConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            concurrency: concurrency.max(1),
            backoff,
            tx: Mutex::new(Some(tx)),
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
            pending: Arc::new(Pending::default()),
            workers: Mutex::new(Vec::new()),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn backoff(&self) -> BackoffConfig {
        self.backoff
    }

    /// Spawn the workers on the current tokio runtime
    ///
    /// Calling `start` more than once has no effect.
    pub fn start(&self) {
        let mut workers = self.workers.lock().unwrap_or_else(|e| e.into_inner());
        if !workers.is_empty() {
            return;
        }
        for worker in 0..self.concurrency {
            let rx = Arc::clone(&self.rx);
            let pending = Arc::clone(&self.pending);
            let backoff = self.backoff;
            workers.push(tokio::spawn(async move {
                loop {
                    let job = rx.lock().await.recv().await;
                    let Some(job) = job else {
                        break;
                    };
                    let outcome = run_with_backoff(job.task, backoff).await;
                    // The submitter may have dropped its handle
                    let _ = job.done.send(outcome);
                    pending.finish();
                }
                tracing::debug!(worker, "pool worker stopped");
            }));
        }
    }

    /// Queue a task for execution
    pub fn submit(&self, task: Task) -> Result<TaskHandle, PoolError> {
        let tx = self.tx.lock().unwrap_or_else(|e| e.into_inner());
        let Some(tx) = tx.as_ref() else {
            return Err(PoolError::Closed);
        };
        let (done, rx) = oneshot::channel();
        let name = task.name.clone();
        self.pending.add();
        if tx.send(Job { task, done }).is_err() {
            self.pending.finish();
            return Err(PoolError::Closed);
        }
        Ok(TaskHandle { name, done: rx })
    }

    /// Wait until every submitted task has finished
    pub async fn wait(&self) {
        self.pending.wait_idle().await;
    }

    /// Stop accepting tasks; already queued tasks still run
    ///
    /// Closing twice is a no-op.
    pub fn close(&self) {
        let mut tx = self.tx.lock().unwrap_or_else(|e| e.into_inner());
        if tx.take().is_some() {
            tracing::debug!("worker pool closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.lock().unwrap_or_else(|e| e.into_inner()).is_none()
    }

    /// Close the pool and wait for the workers to drain the queue
    pub async fn shutdown(&self) {
        self.close();
        let workers = std::mem::take(&mut *self.workers.lock().unwrap_or_else(|e| e.into_inner()));
        for worker in workers {
            if let Err(e) = worker.await {
                tracing::warn!(error = %e, "pool worker panicked");
            }
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("concurrency", &self.concurrency)
            .field("backoff", &self.backoff)
            .field("pending", &self.pending.count.load(Ordering::Relaxed))
            .field("closed", &self.is_closed())
            .finish()
    }
}

async fn run_with_backoff(mut task: Task, backoff: BackoffConfig) -> Result<(), PoolError> {
    let attempts = backoff.attempts();
    let mut delay = backoff.initial_delay;
    let mut last_error = String::new();

    for attempt in 1..=attempts {
        match run_attempt(&mut task).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::warn!(task = %task.name, attempt, attempts, error = %e, "task attempt failed");
                last_error = e;
            }
        }
        if attempt < attempts {
            tokio::time::sleep(delay).await;
            delay = backoff.next_delay(delay);
        }
    }

    tracing::error!(task = %task.name, attempts, error = %last_error, "task gave up");
    Err(PoolError::TaskFailed {
        name: task.name,
        attempts,
        error: last_error,
    })
}

/// Run one attempt, reporting a panic as a failed attempt
async fn run_attempt(task: &mut Task) -> Result<(), String> {
    let attempt = std::panic::catch_unwind(AssertUnwindSafe(|| (task.run)()))
        .map_err(|_| "task panicked".to_string())?;
    match tokio::spawn(attempt).await {
        Ok(result) => result,
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
#[path = "pool_tests.rs"]
mod tests;
