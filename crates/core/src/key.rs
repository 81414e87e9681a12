// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Keys identifying tracked entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;

/// A key the classifier can serialize work on
///
/// Empty keys are a caller error: classifying one yields no event and touches
/// neither the cache nor the lock table.
pub trait ClassifyKey: Eq + Hash + Clone + fmt::Debug + Send + Sync {
    fn is_empty_key(&self) -> bool;

    /// Human-readable form for logs and alerts
    fn label(&self) -> String {
        format!("{:?}", self)
    }
}

impl ClassifyKey for String {
    fn is_empty_key(&self) -> bool {
        self.is_empty()
    }

    fn label(&self) -> String {
        self.clone()
    }
}

impl ClassifyKey for u64 {
    fn is_empty_key(&self) -> bool {
        false
    }

    fn label(&self) -> String {
        self.to_string()
    }
}

impl<K: ClassifyKey> ClassifyKey for Option<K> {
    fn is_empty_key(&self) -> bool {
        match self {
            Some(key) => key.is_empty_key(),
            None => true,
        }
    }

    fn label(&self) -> String {
        match self {
            Some(key) => key.label(),
            None => "<none>".to_string(),
        }
    }
}

/// Namespaced object identity, e.g. `default/web`
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectKey {
    #[serde(default)]
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key for an object that lives outside any namespace
    pub fn cluster_scoped(name: impl Into<String>) -> Self {
        Self::new("", name)
    }

    /// Parse `namespace/name` or a bare `name`
    pub fn parse(s: &str) -> Self {
        match s.split_once('/') {
            Some((namespace, name)) => Self::new(namespace, name),
            None => Self::cluster_scoped(s),
        }
    }
}

impl ClassifyKey for ObjectKey {
    fn is_empty_key(&self) -> bool {
        self.name.is_empty()
    }

    fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}/{}", self.namespace, self.name)
        }
    }
}

impl From<&str> for ObjectKey {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}
