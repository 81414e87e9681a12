// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Global `tracing` subscriber setup

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log level {level:?}: expected trace, debug, info, warn or error")]
    InvalidLevel { level: String },
    #[error("invalid log file {path}")]
    InvalidFile { path: PathBuf },
    #[error("failed to create log directory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("a global tracing subscriber is already installed")]
    AlreadyInstalled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    /// Write logs to this file instead of stderr
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

pub fn parse_level(level: &str) -> Result<Level, LoggingError> {
    level
        .trim()
        .parse::<Level>()
        .map_err(|_| LoggingError::InvalidLevel {
            level: level.to_string(),
        })
}

/// Install the global subscriber
///
/// `RUST_LOG` overrides the configured level. At debug and trace the output
/// drops timestamps and carries `file:line`. When logging to a file, keep the
/// returned guard alive until shutdown so buffered lines get flushed.
pub fn setup_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, LoggingError> {
    let level = parse_level(&config.level)?;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    let (writer, guard) = match &config.file {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            (writer, Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };

    tracing_subscriber::registry()
        .with(format_layer(level, writer, config.file.is_none()))
        .with(filter)
        .try_init()
        .map_err(|_| LoggingError::AlreadyInstalled)?;

    Ok(guard)
}

fn file_writer(path: &std::path::Path) -> Result<(BoxMakeWriter, WorkerGuard), LoggingError> {
    let invalid = || LoggingError::InvalidFile {
        path: path.to_path_buf(),
    };
    let file_name = path.file_name().ok_or_else(invalid)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => std::path::Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|source| LoggingError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
    Ok((BoxMakeWriter::new(non_blocking), guard))
}

fn format_layer(
    level: Level,
    writer: BoxMakeWriter,
    ansi: bool,
) -> Box<dyn Layer<Registry> + Send + Sync> {
    if level >= Level::DEBUG {
        fmt::layer()
            .with_writer(writer)
            .with_ansi(ansi)
            .without_time()
            .with_file(true)
            .with_line_number(true)
            .boxed()
    } else {
        fmt::layer().with_writer(writer).with_ansi(ansi).boxed()
    }
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
