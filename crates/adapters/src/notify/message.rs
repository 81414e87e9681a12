// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification messages with a fixed title and base metadata

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Outcome a notification reports
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Info,
    Error,
}

impl Status {
    fn icon(&self) -> &'static str {
        match self {
            Status::Info => "✅",
            Status::Error => "❌",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Info => f.write_str("info"),
            Status::Error => f.write_str("error"),
        }
    }
}

/// Creates notifications sharing a title and base metadata
#[derive(Clone, Debug, Default)]
pub struct MessageBuilder {
    title: String,
    base_metadata: BTreeMap<String, String>,
}

impl MessageBuilder {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            base_metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata<I, K, V>(mut self, metadata: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.base_metadata
            .extend(metadata.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn notification(&self, status: Status) -> Notification {
        Notification {
            title: self.title.clone(),
            base_metadata: self.base_metadata.clone(),
            status,
            fields: BTreeMap::new(),
            content: None,
        }
    }
}

/// A single notification instance
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    title: String,
    base_metadata: BTreeMap<String, String>,
    status: Status,
    fields: BTreeMap<String, String>,
    content: Option<String>,
}

impl Notification {
    /// Add a field; fields override base metadata with the same key
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        let content = content.into();
        self.content = (!content.is_empty()).then_some(content);
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    /// Base metadata merged with fields, sorted by key
    pub fn fields(&self) -> BTreeMap<&str, &str> {
        self.base_metadata
            .iter()
            .chain(self.fields.iter())
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }

    /// Title line with a status icon, Markdown bold
    pub fn title(&self) -> String {
        format!("{} *{}*\n", self.status.icon(), self.title)
    }

    /// Markdown body for Telegram
    pub fn telegram_body(&self) -> String {
        let mut body = String::new();
        for (key, value) in self.fields() {
            body.push_str(&format!("- *{}*: `{}`\n", key, value));
        }
        if let Some(content) = &self.content {
            body.push_str("\n*Content*\n");
            body.push_str("```text\n");
            body.push_str(content);
            body.push_str("```");
        }
        body
    }

    /// Markdown body for Microsoft Teams
    pub fn teams_body(&self) -> String {
        let mut body = String::new();
        for (key, value) in self.fields() {
            body.push_str(&format!("**{}:** {}  \n", key, value));
        }
        if let Some(content) = &self.content {
            body.push_str("\n---\n\n");
            body.push_str("**Details:**\n\n");
            body.push_str("```\n");
            body.push_str(content);
            body.push_str("\n```\n");
        }
        body
    }
}

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;
