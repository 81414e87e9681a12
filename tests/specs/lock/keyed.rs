// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keyed lock specs

use crate::prelude::*;
use std::sync::atomic::AtomicBool;
use std::sync::Barrier;
use std::thread;

#[test]
fn composite_keys_lock_independently() {
    let locks = KeyedLock::new();
    let web = ObjectKey::new("default", "web");
    let db = ObjectKey::new("default", "db");

    locks.lock(&web);
    locks.lock(&db);
    locks.rlock(&ObjectKey::new("other", "web"));

    assert!(locks.unlock(&web));
    assert!(locks.unlock(&db));
    assert!(locks.runlock(&ObjectKey::new("other", "web")));
    assert_eq!(locks.len(), 3);
}

#[test]
fn misuse_is_reported_not_fatal() {
    let locks: KeyedLock<(u32, u32)> = KeyedLock::new();
    assert!(!locks.unlock(&(1, 1)));
    assert!(!locks.runlock(&(1, 1)));

    locks.lock(&(1, 1));
    assert!(!locks.runlock(&(1, 1)), "read release must not free a write hold");
    assert!(locks.unlock(&(1, 1)));
    assert!(!locks.unlock(&(1, 1)));
}

#[test]
fn readers_overlap_but_never_with_a_writer() {
    for retention in [LockRetention::Retain, LockRetention::Reclaim] {
        let locks = Arc::new(KeyedLock::with_retention(retention));
        let readers = Arc::new(AtomicUsize::new(0));
        let writing = Arc::new(AtomicBool::new(false));
        let max_readers = Arc::new(AtomicUsize::new(0));
        let start = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let locks = Arc::clone(&locks);
                let readers = Arc::clone(&readers);
                let writing = Arc::clone(&writing);
                let max_readers = Arc::clone(&max_readers);
                let start = Arc::clone(&start);
                thread::spawn(move || {
                    start.wait();
                    for i in 0..200 {
                        if (t + i) % 4 == 0 {
                            let _guard = locks.write(&"shared");
                            assert!(!writing.swap(true, Ordering::SeqCst));
                            assert_eq!(readers.load(Ordering::SeqCst), 0);
                            writing.store(false, Ordering::SeqCst);
                        } else {
                            let _guard = locks.read(&"shared");
                            let now = readers.fetch_add(1, Ordering::SeqCst) + 1;
                            max_readers.fetch_max(now, Ordering::SeqCst);
                            assert!(!writing.load(Ordering::SeqCst));
                            thread::yield_now();
                            readers.fetch_sub(1, Ordering::SeqCst);
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert!(max_readers.load(Ordering::SeqCst) >= 1);
        match retention {
            LockRetention::Retain => assert!(locks.contains(&"shared")),
            LockRetention::Reclaim => assert!(locks.is_empty()),
        }
    }
}
