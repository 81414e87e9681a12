// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconcile loop driving a [`StateClassifier`]
//!
//! Keys enter through [`Controller::enqueue`]. Each key is classified on the
//! blocking thread pool, any resulting event is handed to the [`Reconciler`],
//! and the outcome decides whether the key comes back around:
//!
//! - success or "no need to requeue": done, error state cleared
//! - "requeue": enqueued again right away
//! - "requeue after": enqueued again after the requested delay
//! - any other failure: recorded in the error tracker, alerted on, and
//!   enqueued again after `error_requeue_delay`
//!
//! A key is never processed by two tasks at once. Enqueueing a key that is
//! already in flight marks it dirty, and it runs once more when the current
//! pass ends. A delete that comes back around is kept and replayed, since
//! the classifier has already forgotten the object by then.

use crate::config::ControllerConfig;
use crate::error::EngineError;
use crate::notifier::Notifier;
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rk_adapters::{NoOpNotifyAdapter, NotifyAdapter, Status};
use rk_core::{
    handle_reconcile_result, ClassifyKey, ErrorTracker, Event, EventKind, IdGen, ReconcileAction,
    ReconcileError, StateClassifier, UuidIdGen,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tracing::Instrument;

/// Handles the events produced for a key
#[async_trait]
pub trait Reconciler<T: Send + 'static>: Send + Sync + 'static {
    async fn reconcile(&self, event: Event<T>) -> Result<(), ReconcileError>;
}

/// Collaborators a controller is built from
pub struct ControllerDeps<K, T, R, N = NoOpNotifyAdapter, I = UuidIdGen> {
    pub classifier: StateClassifier<K, T>,
    pub reconciler: R,
    pub notifier: Option<Notifier<N>>,
    pub id_gen: I,
}

impl<K, T, R> ControllerDeps<K, T, R> {
    /// Deps without alerting, using random log ids
    pub fn new(classifier: StateClassifier<K, T>, reconciler: R) -> Self {
        Self {
            classifier,
            reconciler,
            notifier: None,
            id_gen: UuidIdGen,
        }
    }
}

struct Shared<K, T, R, N, I> {
    classifier: StateClassifier<K, T>,
    reconciler: R,
    notifier: Option<Notifier<N>>,
    id_gen: I,
    errors: ErrorTracker<K>,
    /// Keys being processed, with whether they were enqueued again meanwhile
    inflight: DashMap<K, bool>,
    pending_deletes: DashMap<K, Event<T>>,
    error_requeue_delay: Duration,
    queue: mpsc::UnboundedSender<K>,
    stopping: AtomicBool,
}

/// Running reconcile loop
pub struct Controller<K, T, R, N = NoOpNotifyAdapter, I = UuidIdGen> {
    shared: Arc<Shared<K, T, R, N, I>>,
    stop: watch::Sender<bool>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

impl<K, T, R, N, I> Controller<K, T, R, N, I>
where
    K: ClassifyKey + 'static,
    T: Clone + Send + Sync + 'static,
    R: Reconciler<T>,
    N: NotifyAdapter,
    I: IdGen + 'static,
{
    /// Start the dispatcher on the current tokio runtime
    pub fn start(deps: ControllerDeps<K, T, R, N, I>, config: &ControllerConfig) -> Self {
        let (queue, rx) = mpsc::unbounded_channel();
        let (stop, stopped) = watch::channel(false);
        let shared = Arc::new(Shared {
            classifier: deps.classifier.with_lock_retention(config.lock_retention),
            reconciler: deps.reconciler,
            notifier: deps.notifier,
            id_gen: deps.id_gen,
            errors: ErrorTracker::new(),
            inflight: DashMap::new(),
            pending_deletes: DashMap::new(),
            error_requeue_delay: config.error_requeue_delay,
            queue,
            stopping: AtomicBool::new(false),
        });

        let workers = config.workers.max(1);
        tracing::info!(workers, "controller starting");
        let dispatcher = tokio::spawn(dispatch(Arc::clone(&shared), rx, stopped, workers));

        Self {
            shared,
            stop,
            dispatcher: Mutex::new(Some(dispatcher)),
        }
    }

    /// Queue `key` for classification
    pub fn enqueue(&self, key: K) -> Result<(), EngineError> {
        self.shared.enqueue(key)
    }

    pub fn classifier(&self) -> &StateClassifier<K, T> {
        &self.shared.classifier
    }

    pub fn errors(&self) -> &ErrorTracker<K> {
        &self.shared.errors
    }

    pub fn is_stopping(&self) -> bool {
        self.shared.stopping.load(Ordering::Acquire)
    }

    /// Stop intake and wait for in-flight reconciles and queued alerts
    ///
    /// Keys still waiting in the queue or on a requeue timer are dropped.
    pub async fn shutdown(&self) {
        if self.shared.stopping.swap(true, Ordering::AcqRel) {
            return;
        }
        tracing::info!("controller stopping");
        let _ = self.stop.send(true);

        let dispatcher = self
            .dispatcher
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(dispatcher) = dispatcher {
            if let Err(e) = dispatcher.await {
                tracing::error!(error = %e, "controller dispatcher failed");
            }
        }
        if let Some(notifier) = &self.shared.notifier {
            notifier.shutdown().await;
        }
        tracing::info!("controller stopped");
    }
}

async fn dispatch<K, T, R, N, I>(
    shared: Arc<Shared<K, T, R, N, I>>,
    mut rx: mpsc::UnboundedReceiver<K>,
    mut stopped: watch::Receiver<bool>,
    workers: usize,
) where
    K: ClassifyKey + 'static,
    T: Clone + Send + Sync + 'static,
    R: Reconciler<T>,
    N: NotifyAdapter,
    I: IdGen + 'static,
{
    let slots = Arc::new(Semaphore::new(workers));
    let mut inflight = JoinSet::new();

    loop {
        tokio::select! {
            biased;
            _ = stopped.changed() => break,
            Some(joined) = inflight.join_next(), if !inflight.is_empty() => {
                if let Err(e) = joined {
                    tracing::error!(error = %e, "reconcile task failed");
                }
            }
            key = rx.recv() => {
                let Some(key) = key else { break };
                if !shared.claim(&key) {
                    tracing::trace!(key = %key.label(), "key in flight, marked dirty");
                    continue;
                }
                let permit = tokio::select! {
                    _ = stopped.changed() => break,
                    permit = Arc::clone(&slots).acquire_owned() => permit,
                };
                let Ok(permit) = permit else { break };
                let claim = Claim {
                    shared: Arc::clone(&shared),
                    key: Some(key.clone()),
                };
                let shared = Arc::clone(&shared);
                inflight.spawn(async move {
                    shared.process(key).await;
                    drop(claim);
                    drop(permit);
                });
            }
        }
    }

    while let Some(joined) = inflight.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "reconcile task failed");
        }
    }
}

impl<K, T, R, N, I> Shared<K, T, R, N, I>
where
    K: ClassifyKey + 'static,
    T: Clone + Send + Sync + 'static,
    R: Reconciler<T>,
    N: NotifyAdapter,
    I: IdGen + 'static,
{
    fn enqueue(&self, key: K) -> Result<(), EngineError> {
        if self.stopping.load(Ordering::Acquire) {
            return Err(EngineError::Stopped);
        }
        self.queue.send(key).map_err(|_| EngineError::Stopped)
    }

    /// Mark `key` in flight, or dirty if it already is
    fn claim(&self, key: &K) -> bool {
        match self.inflight.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                *entry.get_mut() = true;
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(false);
                true
            }
        }
    }

    fn release(&self, key: K) {
        let dirty = self.inflight.remove(&key).is_some_and(|(_, dirty)| dirty);
        if dirty {
            if let Err(e) = self.enqueue(key) {
                tracing::debug!(error = %e, "dirty requeue dropped");
            }
        }
    }

    fn requeue_after(self: &Arc<Self>, key: K, delay: Duration) {
        if delay.is_zero() {
            if let Err(e) = self.enqueue(key) {
                tracing::debug!(error = %e, "requeue dropped");
            }
            return;
        }
        let shared = Arc::clone(self);
        tokio::spawn(
            async move {
                tokio::time::sleep(delay).await;
                if let Err(e) = shared.enqueue(key) {
                    tracing::debug!(error = %e, "delayed requeue dropped");
                }
            }
            .in_current_span(),
        );
    }

    async fn process(self: Arc<Self>, key: K) {
        let span = tracing::info_span!("reconcile", id = %self.id_gen.next(), key = %key.label());
        async move {
            let classified = {
                let shared = Arc::clone(&self);
                let key = key.clone();
                tokio::task::spawn_blocking(move || shared.classifier.classify(&key)).await
            };
            let event = match classified {
                Ok(Some(event)) => {
                    self.pending_deletes.remove(&key);
                    event
                }
                Ok(None) => match self.pending_deletes.remove(&key) {
                    Some((_, event)) => {
                        tracing::info!("replaying pending delete");
                        event
                    }
                    None => {
                        if self.errors.delete(&key) {
                            self.alert(Status::Info, &key, None, String::new());
                        }
                        tracing::debug!("nothing to reconcile");
                        return;
                    }
                },
                Err(e) => {
                    tracing::error!(error = %e, "classification failed");
                    return;
                }
            };

            let kind = event.kind();
            let replay = (kind == EventKind::Delete).then(|| event.clone());
            tracing::info!(event = %kind, "reconciling");
            let action = handle_reconcile_result(self.reconciler.reconcile(event).await);
            if let Some(replay) = replay.filter(|_| action != ReconcileAction::Done) {
                self.pending_deletes.insert(key.clone(), replay);
            }
            self.settle(key, kind, action);
        }
        .instrument(span)
        .await
    }

    fn settle(self: &Arc<Self>, key: K, kind: EventKind, action: ReconcileAction) {
        match action {
            ReconcileAction::Retry { error } => {
                if self.errors.store(key.clone()) {
                    self.alert(Status::Error, &key, Some(kind), error);
                }
                self.requeue_after(key, self.error_requeue_delay);
            }
            action => {
                if self.errors.delete(&key) {
                    self.alert(Status::Info, &key, Some(kind), String::new());
                }
                match action {
                    ReconcileAction::Requeue => self.requeue_after(key, Duration::ZERO),
                    ReconcileAction::RequeueAfter(delay) => self.requeue_after(key, delay),
                    _ => {}
                }
            }
        }
    }

    fn alert(&self, status: Status, key: &K, kind: Option<EventKind>, content: String) {
        let Some(notifier) = &self.notifier else {
            return;
        };
        let state = match status {
            Status::Error => "failing",
            Status::Info => "recovered",
        };
        let mut fields = vec![("key", key.label()), ("state", state.to_string())];
        if let Some(kind) = kind {
            fields.push(("event", kind.to_string()));
        }
        if let Err(e) = notifier.notify(status, fields, content) {
            tracing::warn!(error = %e, "alert not queued");
        }
    }
}

/// In-flight marker for one key, released when the pass ends or panics
struct Claim<K, T, R, N, I>
where
    K: ClassifyKey + 'static,
    T: Clone + Send + Sync + 'static,
    R: Reconciler<T>,
    N: NotifyAdapter,
    I: IdGen + 'static,
{
    shared: Arc<Shared<K, T, R, N, I>>,
    key: Option<K>,
}

impl<K, T, R, N, I> Drop for Claim<K, T, R, N, I>
where
    K: ClassifyKey + 'static,
    T: Clone + Send + Sync + 'static,
    R: Reconciler<T>,
    N: NotifyAdapter,
    I: IdGen + 'static,
{
    fn drop(&mut self) {
        if let Some(key) = self.key.take() {
            self.shared.release(key);
        }
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
