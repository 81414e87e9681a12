// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration specs
//!
//! A config file on disk is enough to stand up a controller and its alerting.

use crate::prelude::*;
use rk_engine::{Config, ConfigError};
use std::io::Write;

const CONFIG: &str = r#"
[logging]
level = "warn"

[controller]
workers = 2
error_requeue_delay = "15ms"
lock_retention = "reclaim"

[alert]
title = "inventory-sync"
metadata = { cluster = "staging" }

[alert.backoff]
initial_delay = "5ms"
max_retries = 1
"#;

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[tokio::test]
async fn controller_runs_from_config_file() {
    let file = write_config(CONFIG);
    let config = Config::load(file.path()).unwrap();
    let alert = config.alert.clone().unwrap();
    assert_eq!(alert.webhook_notifier().unwrap().target_count(), 0);

    let cluster = Cluster::new();
    let journal = Journal::new().then_fail("transient");
    let fake = FakeNotifyAdapter::new();
    let controller = Controller::start(
        ControllerDeps {
            classifier: cluster.classifier(),
            reconciler: journal.clone(),
            notifier: Some(Notifier::from_config(fake.clone(), &alert)),
            id_gen: SequentialIdGen::default(),
        },
        &config.controller,
    );

    let key = cluster.apply("default/sku-42");
    controller.enqueue(key).unwrap();
    eventually("retried after failure", || journal.len() == 2).await;
    controller.shutdown().await;

    // Reclaim retention leaves no idle lock entries behind
    assert_eq!(controller.classifier().lock_table_len(), 0);

    let alerts = fake.delivered();
    assert_eq!(alerts.len(), 2);
    assert!(alerts[0].title().contains("inventory-sync"));
    assert_eq!(alerts[0].fields().get("cluster"), Some(&"staging"));
}

#[test]
fn invalid_config_names_the_field() {
    let file = write_config("[controller]\nworkers = 0\n");
    let err = Config::load(file.path()).unwrap_err();
    assert!(matches!(
        err,
        ConfigError::Invalid {
            field: "controller.workers",
            ..
        }
    ));
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let file = write_config("[controller\nworkers = 2\n");
    assert!(matches!(
        Config::load(file.path()).unwrap_err(),
        ConfigError::Parse(_)
    ));
}
