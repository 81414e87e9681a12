// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Classification specs
//!
//! Walk single keys through their lifetime and check the event produced at
//! every step, along with what the classifier keeps cached.

use crate::prelude::*;

fn classify(classifier: &StateClassifier<ObjectKey, Resource>, key: &ObjectKey) -> Option<String> {
    classifier.classify(key).map(|event| crate::prelude::describe(&event))
}

#[test]
fn object_lifecycle_produces_create_sync_delete() {
    let cluster = Cluster::new();
    let classifier = cluster.classifier();
    let key = ObjectKey::parse("default/web");

    assert_eq!(classify(&classifier, &key), None);

    cluster.apply("default/web");
    assert_eq!(classify(&classifier, &key).as_deref(), Some("CREATE default/web@1"));

    cluster.apply("default/web");
    assert_eq!(
        classify(&classifier, &key).as_deref(),
        Some("SYNC default/web@2 (was @1)")
    );

    cluster.remove(&key);
    assert_eq!(classify(&classifier, &key).as_deref(), Some("DELETE default/web@2"));
    assert_eq!(classifier.cached(&key), None);
    assert_eq!(classify(&classifier, &key), None);
}

#[test]
fn unchanged_object_syncs_every_time() {
    let cluster = Cluster::new();
    let classifier = cluster.classifier();
    let key = cluster.apply("default/web");

    assert_eq!(classify(&classifier, &key).as_deref(), Some("CREATE default/web@1"));
    for _ in 0..3 {
        assert_eq!(
            classify(&classifier, &key).as_deref(),
            Some("SYNC default/web@1 (was @1)")
        );
    }
    assert_eq!(classifier.cached(&key).unwrap().generation, 1);
}

#[test]
fn broken_object_is_deleted_then_recreated_when_fixed() {
    let cluster = Cluster::new();
    let classifier = cluster.classifier();
    let key = cluster.apply("default/api");
    classify(&classifier, &key);

    // A broken object replaces a good cached one: report the cached one as gone
    cluster.break_object(&key);
    assert_eq!(classify(&classifier, &key).as_deref(), Some("DELETE default/api@1"));

    // Still broken, nothing cached: nothing to say
    assert_eq!(classify(&classifier, &key), None);

    cluster.apply("default/api");
    assert_eq!(classify(&classifier, &key).as_deref(), Some("CREATE default/api@3"));
}

#[test]
fn broken_object_never_seen_before_is_ignored() {
    let cluster = Cluster::new();
    let classifier = cluster.classifier();
    let key = cluster.apply("default/draft");
    cluster.break_object(&key);

    assert_eq!(classify(&classifier, &key), None);
    assert_eq!(classifier.cache_len(), 0);
}

#[test]
fn deletion_marker_wins_over_validity() {
    let cluster = Cluster::new();
    let classifier = cluster.classifier();
    let key = cluster.apply("default/db");
    classify(&classifier, &key);

    cluster.begin_deletion(&key);
    assert_eq!(classify(&classifier, &key).as_deref(), Some("DELETE default/db@2"));
    assert_eq!(classifier.cached(&key), None);

    // Marked objects keep producing deletes until they disappear
    assert_eq!(classify(&classifier, &key).as_deref(), Some("DELETE default/db@2"));

    cluster.remove(&key);
    assert_eq!(classify(&classifier, &key), None);
}

#[test]
fn marked_object_never_seen_before_is_still_deleted() {
    let cluster = Cluster::new();
    let classifier = cluster.classifier();
    let key = cluster.apply("default/orphan");
    cluster.begin_deletion(&key);

    assert_eq!(classify(&classifier, &key).as_deref(), Some("DELETE default/orphan@2"));
}

#[test]
fn empty_key_is_ignored_without_side_effects() {
    let cluster = Cluster::new();
    let classifier = cluster.classifier();

    assert_eq!(classify(&classifier, &ObjectKey::new("default", "")), None);
    assert_eq!(classify(&classifier, &ObjectKey::default()), None);

    assert_eq!(cluster.fetches(), 0);
    assert_eq!(classifier.cache_len(), 0);
    assert_eq!(classifier.lock_table_len(), 0);
}

#[test]
fn cluster_scoped_keys_are_independent_of_namespaced_ones() {
    let cluster = Cluster::new();
    let classifier = cluster.classifier();
    let scoped = cluster.apply("node-1");
    let namespaced = cluster.apply("default/node-1");

    assert_eq!(classify(&classifier, &scoped).as_deref(), Some("CREATE node-1@1"));
    assert_eq!(
        classify(&classifier, &namespaced).as_deref(),
        Some("CREATE default/node-1@1")
    );
    assert_eq!(classifier.cache_len(), 2);
}
