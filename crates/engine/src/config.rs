// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! TOML configuration for a reconcile controller
//!
//! ```toml
//! [logging]
//! level = "debug"
//!
//! [controller]
//! workers = 8
//! error_requeue_delay = "10s"
//! lock_retention = "reclaim"
//!
//! [alert]
//! title = "payments-operator"
//! metadata = { cluster = "prod-1" }
//!
//! [alert.msteams]
//! webhook_url = "https://example.webhook.office.com/..."
//!
//! [alert.telegram]
//! bot_token = "123:abc"
//! chat_id = -10042
//! proxy_url = "http://proxy.internal:3128"
//!
//! [alert.backoff]
//! initial_delay = "10s"
//! max_retries = 3
//! factor = 2.0
//! ```

use crate::logging::{parse_level, LoggingConfig};
use crate::pool::BackoffConfig;
use chrono::{FixedOffset, Offset, Utc};
use rk_adapters::{MessageBuilder, NotifyError, WebhookNotifier};
use rk_core::LockRetention;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Top-level configuration file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub logging: LoggingConfig,
    pub controller: ControllerConfig,
    /// Alerting is disabled when the section is absent
    pub alert: Option<AlertConfig>,
}

impl Config {
    /// Read and validate a TOML config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        parse_level(&self.logging.level)
            .map_err(|e| ConfigError::invalid("logging.level", e.to_string()))?;
        if self.controller.workers == 0 {
            return Err(ConfigError::invalid(
                "controller.workers",
                "must be at least 1",
            ));
        }
        if let Some(alert) = &self.alert {
            alert.validate()?;
        }
        Ok(())
    }
}

/// Controller tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControllerConfig {
    /// Maximum number of keys reconciled at once
    pub workers: usize,
    /// Delay before a key whose reconcile failed is retried
    #[serde(with = "humantime_serde")]
    pub error_requeue_delay: Duration,
    pub lock_retention: LockRetention,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            workers: 4,
            error_requeue_delay: Duration::from_secs(5),
            lock_retention: LockRetention::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MsTeamsConfig {
    pub webhook_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
}

/// Alert delivery settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AlertConfig {
    pub title: String,
    /// Fields attached to every alert
    pub metadata: BTreeMap<String, String>,
    /// Offset applied to the `timestamp` field, in minutes east of UTC
    pub utc_offset_minutes: i32,
    /// Concurrent deliveries
    pub workers: usize,
    pub msteams: Option<MsTeamsConfig>,
    pub telegram: Option<TelegramConfig>,
    pub backoff: BackoffConfig,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            title: "reconkit".to_string(),
            metadata: BTreeMap::new(),
            utc_offset_minutes: 7 * 60,
            workers: 2,
            msteams: None,
            telegram: None,
            backoff: BackoffConfig {
                initial_delay: Duration::from_secs(10),
                max_retries: 3,
                factor: 2.0,
            },
        }
    }
}

impl AlertConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::invalid("alert.workers", "must be at least 1"));
        }
        if !self.backoff.factor.is_finite() || self.backoff.factor < 1.0 {
            return Err(ConfigError::invalid(
                "alert.backoff.factor",
                format!("must be a finite number >= 1.0, got {}", self.backoff.factor),
            ));
        }
        if FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60)).is_none() {
            return Err(ConfigError::invalid(
                "alert.utc_offset_minutes",
                format!("{} is outside +/-24h", self.utc_offset_minutes),
            ));
        }
        Ok(())
    }

    /// Offset for alert timestamps, UTC if out of range
    pub fn utc_offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_minutes.saturating_mul(60))
            .unwrap_or_else(|| Utc.fix())
    }

    pub fn message_builder(&self) -> MessageBuilder {
        MessageBuilder::new(self.title.clone()).with_metadata(self.metadata.clone())
    }

    /// Build the webhook notifier for the configured targets
    ///
    /// The Telegram proxy, when set, applies to every webhook request.
    pub fn webhook_notifier(&self) -> Result<WebhookNotifier, NotifyError> {
        let proxy = self
            .telegram
            .as_ref()
            .and_then(|telegram| telegram.proxy_url.as_deref())
            .filter(|url| !url.is_empty());
        let mut notifier = match proxy {
            Some(url) => WebhookNotifier::with_proxy(url)?,
            None => WebhookNotifier::new(),
        };
        if let Some(teams) = &self.msteams {
            notifier = notifier.teams(teams.webhook_url.clone());
        }
        if let Some(telegram) = &self.telegram {
            notifier = notifier.telegram(telegram.bot_token.clone(), telegram.chat_id);
        }
        Ok(notifier)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
