// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for behavioral specs
//!
//! `Cluster` plays the external source of truth, `Journal` plays the
//! reconciler and records every event it receives as a readable line such
//! as `CREATE default/web@1`.

#![allow(dead_code)]

pub use async_trait::async_trait;
pub use rk_adapters::{FakeNotifyAdapter, MessageBuilder, Status};
pub use rk_core::{
    ClassifyKey, Event, EventKind, KeyedLock, LockRetention, ObjectKey, ReconcileError,
    RequeueError, SequentialIdGen, StateClassifier,
};
pub use rk_engine::{
    BackoffConfig, Controller, ControllerConfig, ControllerDeps, EngineError, Notifier,
    Reconciler, WorkerPool,
};
pub use std::sync::atomic::{AtomicUsize, Ordering};
pub use std::sync::{Arc, Mutex};
pub use std::time::Duration;

use std::collections::{HashMap, VecDeque};

#[derive(Clone, Debug, PartialEq)]
pub struct Resource {
    pub key: ObjectKey,
    pub generation: u64,
    pub ready: bool,
    pub finalizing: bool,
}

impl Resource {
    pub fn describe(&self) -> String {
        format!("{}@{}", self.key, self.generation)
    }
}

/// In-memory source of truth keyed by `namespace/name`
#[derive(Clone, Default)]
pub struct Cluster {
    objects: Arc<Mutex<HashMap<ObjectKey, Resource>>>,
    fetches: Arc<AtomicUsize>,
}

impl Cluster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the object, or bump its generation if it exists
    pub fn apply(&self, key: &str) -> ObjectKey {
        let key = ObjectKey::parse(key);
        let mut objects = self.objects.lock().unwrap();
        let generation = objects.get(&key).map_or(1, |o| o.generation + 1);
        objects.insert(
            key.clone(),
            Resource {
                key: key.clone(),
                generation,
                ready: true,
                finalizing: false,
            },
        );
        key
    }

    pub fn break_object(&self, key: &ObjectKey) {
        self.edit(key, |o| o.ready = false);
    }

    pub fn begin_deletion(&self, key: &ObjectKey) {
        self.edit(key, |o| o.finalizing = true);
    }

    pub fn remove(&self, key: &ObjectKey) {
        self.objects.lock().unwrap().remove(key);
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn classifier(&self) -> StateClassifier<ObjectKey, Resource> {
        let cluster = self.clone();
        StateClassifier::new(
            move |key: &ObjectKey| {
                cluster.fetches.fetch_add(1, Ordering::SeqCst);
                cluster.objects.lock().unwrap().get(key).cloned()
            },
            |obj: Option<&Resource>| obj.is_some_and(|o| o.ready),
            |obj: &Resource| obj.finalizing,
        )
    }

    fn edit(&self, key: &ObjectKey, change: impl FnOnce(&mut Resource)) {
        let mut objects = self.objects.lock().unwrap();
        let obj = objects.get_mut(key).unwrap();
        obj.generation += 1;
        change(obj);
    }
}

/// Render an event the way the journal records it
pub fn describe(event: &Event<Resource>) -> String {
    match event {
        Event::Sync { current, previous } => format!(
            "{} {} (was @{})",
            event.kind(),
            current.describe(),
            previous.generation
        ),
        _ => format!("{} {}", event.kind(), event.current().describe()),
    }
}

/// Reconciler that journals events and replays scripted outcomes
#[derive(Clone, Default)]
pub struct Journal {
    lines: Arc<Mutex<Vec<String>>>,
    script: Arc<Mutex<VecDeque<Result<(), ReconcileError>>>>,
    active: Arc<Mutex<HashMap<ObjectKey, usize>>>,
    peak: Arc<AtomicUsize>,
    delay: Duration,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every reconcile for `delay`
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn then_succeed(self) -> Self {
        self.push(Ok(()))
    }

    pub fn then_fail(self, message: &str) -> Self {
        self.push(Err(ReconcileError::msg(message)))
    }

    pub fn then_requeue(self, err: RequeueError) -> Self {
        self.push(Err(err.into()))
    }

    fn push(self, result: Result<(), ReconcileError>) -> Self {
        self.script.lock().unwrap().push_back(result);
        self
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().unwrap().len()
    }

    /// Most reconciles ever running at once for a single key
    pub fn peak_per_key(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn enter(&self, key: &ObjectKey) {
        let mut active = self.active.lock().unwrap();
        let running = active.entry(key.clone()).or_default();
        *running += 1;
        self.peak.fetch_max(*running, Ordering::SeqCst);
    }

    fn exit(&self, key: &ObjectKey) {
        if let Some(running) = self.active.lock().unwrap().get_mut(key) {
            *running -= 1;
        }
    }
}

#[async_trait]
impl Reconciler<Resource> for Journal {
    async fn reconcile(&self, event: Event<Resource>) -> Result<(), ReconcileError> {
        let key = event.current().key.clone();
        self.enter(&key);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.exit(&key);
        self.lines.lock().unwrap().push(describe(&event));
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or(Ok(()))
    }
}

pub type SpecController = Controller<ObjectKey, Resource, Journal, FakeNotifyAdapter, SequentialIdGen>;

/// Controller over `cluster` with fast retries
pub fn controller(
    cluster: &Cluster,
    journal: &Journal,
    notify: Option<&FakeNotifyAdapter>,
) -> SpecController {
    let notifier = notify.map(|fake| {
        Notifier::new(
            fake.clone(),
            MessageBuilder::new("spec-controller").with_metadata([("env", "test")]),
            chrono::FixedOffset::east_opt(0).unwrap(),
            WorkerPool::new(
                1,
                BackoffConfig {
                    initial_delay: Duration::from_millis(1),
                    max_retries: 1,
                    factor: 2.0,
                },
            ),
        )
    });
    Controller::start(
        ControllerDeps {
            classifier: cluster.classifier(),
            reconciler: journal.clone(),
            notifier,
            id_gen: SequentialIdGen::default(),
        },
        &ControllerConfig {
            workers: 4,
            error_requeue_delay: Duration::from_millis(10),
            lock_retention: LockRetention::Retain,
        },
    )
}

/// Poll `done` until it holds, failing after five seconds
pub async fn eventually(what: &str, mut done: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !done() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {what}");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}
