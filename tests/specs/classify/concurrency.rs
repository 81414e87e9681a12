// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Concurrent classification specs

use crate::prelude::*;
use std::collections::HashMap;
use std::sync::mpsc;
use std::thread;

#[test]
fn slow_fetch_on_one_key_does_not_block_others() {
    let (release_tx, release_rx) = mpsc::channel::<()>();
    let release_rx = Mutex::new(release_rx);
    let classifier = Arc::new(StateClassifier::new(
        move |key: &String| {
            if key == "stuck" {
                // Parks until the test lets go
                let _ = release_rx.lock().unwrap().recv();
            }
            Some(key.clone())
        },
        |obj: Option<&String>| obj.is_some(),
        |_: &String| false,
    ));

    let stuck = {
        let classifier = Arc::clone(&classifier);
        thread::spawn(move || classifier.classify(&"stuck".to_string()))
    };

    let (done_tx, done_rx) = mpsc::channel();
    let fast = {
        let classifier = Arc::clone(&classifier);
        thread::spawn(move || {
            for i in 0..100 {
                classifier.classify(&format!("fast-{}", i % 5));
            }
            done_tx.send(()).unwrap();
        })
    };

    done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
    fast.join().unwrap();

    release_tx.send(()).unwrap();
    let event = stuck.join().unwrap().unwrap();
    assert_eq!(event.kind(), EventKind::Create);
}

#[test]
fn mixed_outcomes_under_load_match_the_table() {
    let cluster = Cluster::new();
    let live = cluster.apply("default/live");
    let doomed = cluster.apply("default/doomed");
    cluster.begin_deletion(&doomed);
    let gone = ObjectKey::parse("default/gone");

    let classifier = Arc::new(cluster.classifier());
    let keys = Arc::new([live.clone(), doomed.clone(), gone.clone()]);
    let threads = 8;
    let rounds = 90;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let classifier = Arc::clone(&classifier);
            let keys = Arc::clone(&keys);
            thread::spawn(move || {
                let mut counts: HashMap<EventKind, usize> = HashMap::new();
                for i in 0..rounds {
                    let key = &keys[(t + i) % keys.len()];
                    if let Some(event) = classifier.classify(key) {
                        *counts.entry(event.kind()).or_default() += 1;
                    }
                }
                counts
            })
        })
        .collect();

    let mut totals: HashMap<EventKind, usize> = HashMap::new();
    for handle in handles {
        for (kind, n) in handle.join().unwrap() {
            *totals.entry(kind).or_default() += n;
        }
    }

    let per_key = threads * rounds / 3;
    assert_eq!(totals.get(&EventKind::Create).copied(), Some(1));
    assert_eq!(totals.get(&EventKind::Sync).copied(), Some(per_key - 1));
    assert_eq!(totals.get(&EventKind::Delete).copied(), Some(per_key));
    assert_eq!(classifier.cached(&live).unwrap().generation, 1);
    assert_eq!(classifier.cached(&doomed), None);
    assert_eq!(classifier.cached(&gone), None);
    assert_eq!(cluster.fetches(), threads * rounds);
}

#[test]
fn reclaiming_classifier_leaves_no_lock_entries() {
    let cluster = Cluster::new();
    let classifier =
        Arc::new(cluster.classifier().with_lock_retention(LockRetention::Reclaim));
    let keys: Vec<_> = (0..6).map(|i| cluster.apply(&format!("default/app-{}", i))).collect();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let classifier = Arc::clone(&classifier);
            let keys = keys.clone();
            thread::spawn(move || {
                for key in keys.iter().cycle().take(120) {
                    classifier.classify(key);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(classifier.lock_table_len(), 0);
    assert_eq!(classifier.cache_len(), 6);
}
