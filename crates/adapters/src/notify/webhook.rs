// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Webhook delivery to Microsoft Teams and the Telegram Bot API

use super::{Notification, NotifyAdapter, NotifyError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

const TELEGRAM_API: &str = "https://api.telegram.org";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
enum Target {
    Teams {
        webhook_url: String,
    },
    Telegram {
        api_base: String,
        bot_token: String,
        chat_id: i64,
    },
}

impl Target {
    fn name(&self) -> &'static str {
        match self {
            Target::Teams { .. } => "msteams",
            Target::Telegram { .. } => "telegram",
        }
    }

    fn url(&self) -> String {
        match self {
            Target::Teams { webhook_url } => webhook_url.clone(),
            Target::Telegram {
                api_base,
                bot_token,
                ..
            } => format!("{}/bot{}/sendMessage", api_base, bot_token),
        }
    }

    fn payload(&self, notification: &Notification) -> Value {
        match self {
            Target::Teams { .. } => teams_payload(notification),
            Target::Telegram { chat_id, .. } => telegram_payload(*chat_id, notification),
        }
    }
}

/// Teams MessageCard payload
pub(crate) fn teams_payload(notification: &Notification) -> Value {
    let title = notification.title();
    json!({
        "@type": "MessageCard",
        "@context": "https://schema.org/extensions",
        "summary": title.trim(),
        "title": title.trim(),
        "text": notification.teams_body(),
    })
}

/// Telegram `sendMessage` payload in Markdown mode
pub(crate) fn telegram_payload(chat_id: i64, notification: &Notification) -> Value {
    json!({
        "chat_id": chat_id,
        "parse_mode": "Markdown",
        "text": format!("{}\n{}", notification.title(), notification.telegram_body()),
    })
}

/// Posts notifications to every configured webhook target
#[derive(Clone)]
pub struct WebhookNotifier {
    agent: ureq::Agent,
    targets: Vec<Target>,
}

impl WebhookNotifier {
    /// Notifier with no targets; sending is a no-op until targets are added
    pub fn new() -> Self {
        Self::with_agent(None)
    }

    /// Route all requests through an HTTP proxy
    pub fn with_proxy(proxy_url: &str) -> Result<Self, NotifyError> {
        let proxy = ureq::Proxy::new(proxy_url).map_err(|e| NotifyError::InvalidProxy {
            url: proxy_url.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self::with_agent(Some(proxy)))
    }

    fn with_agent(proxy: Option<ureq::Proxy>) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(REQUEST_TIMEOUT))
            .proxy(proxy)
            .build()
            .into();
        Self {
            agent,
            targets: Vec::new(),
        }
    }

    /// Add a Teams incoming-webhook target; empty urls are ignored
    pub fn teams(mut self, webhook_url: impl Into<String>) -> Self {
        let webhook_url = webhook_url.into();
        if !webhook_url.is_empty() {
            self.targets.push(Target::Teams { webhook_url });
        }
        self
    }

    /// Add a Telegram chat target; an empty token or zero chat id is ignored
    pub fn telegram(self, bot_token: impl Into<String>, chat_id: i64) -> Self {
        self.telegram_at(TELEGRAM_API, bot_token, chat_id)
    }

    /// Telegram target against a custom Bot API endpoint
    pub fn telegram_at(
        mut self,
        api_base: impl Into<String>,
        bot_token: impl Into<String>,
        chat_id: i64,
    ) -> Self {
        let bot_token = bot_token.into();
        if !bot_token.is_empty() && chat_id != 0 {
            self.targets.push(Target::Telegram {
                api_base: api_base.into().trim_end_matches('/').to_string(),
                bot_token,
                chat_id,
            });
        }
        self
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    fn post(agent: &ureq::Agent, target: &Target, payload: &Value) -> Result<(), NotifyError> {
        let body = payload.to_string();
        agent
            .post(target.url().as_str())
            .header("Content-Type", "application/json")
            .send(body.as_str())
            .map(|_| ())
            .map_err(|e| NotifyError::Failed(format!("{}: {}", target.name(), e)))
    }
}

impl Default for WebhookNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.targets.iter().map(Target::name).collect();
        f.debug_struct("WebhookNotifier")
            .field("targets", &names)
            .finish()
    }
}

#[async_trait]
impl NotifyAdapter for WebhookNotifier {
    async fn send(&self, notification: &Notification) -> Result<(), NotifyError> {
        if self.targets.is_empty() {
            return Ok(());
        }

        let agent = self.agent.clone();
        let requests: Vec<(Target, Value)> = self
            .targets
            .iter()
            .map(|target| (target.clone(), target.payload(notification)))
            .collect();

        // ureq is blocking
        let failures = tokio::task::spawn_blocking(move || {
            requests
                .iter()
                .filter_map(|(target, payload)| Self::post(&agent, target, payload).err())
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
        })
        .await
        .map_err(|e| NotifyError::Failed(format!("delivery task failed: {}", e)))?;

        if failures.is_empty() {
            Ok(())
        } else {
            Err(NotifyError::Failed(failures.join("; ")))
        }
    }
}

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod tests;
