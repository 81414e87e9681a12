// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine

use crate::config::ConfigError;
use crate::logging::LoggingError;
use crate::pool::PoolError;
use rk_adapters::NotifyError;
use thiserror::Error;

/// Errors that can occur while running a controller
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("logging error: {0}")]
    Logging(#[from] LoggingError),
    #[error("notify error: {0}")]
    Notify(#[from] NotifyError),
    #[error("pool error: {0}")]
    Pool(#[from] PoolError),
    #[error("controller is stopped")]
    Stopped,
}
