// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! reconkit engine: the reconcile loop and its runtime plumbing

pub mod config;
mod controller;
mod error;
pub mod logging;
mod notifier;
mod pool;
mod version;

pub use config::{AlertConfig, Config, ConfigError, ControllerConfig};
pub use controller::{Controller, ControllerDeps, Reconciler};
pub use error::EngineError;
pub use logging::{setup_logging, LoggingConfig, LoggingError};
pub use notifier::{Notifier, TIMESTAMP_FORMAT};
pub use pool::{BackoffConfig, PoolError, Task, TaskHandle, WorkerPool};
pub use version::{commit, version, PKG_VERSION};
