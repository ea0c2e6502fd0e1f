// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Nested string-keyed configuration accessor.
//!
//! The surrounding daemon parses its config text; stores only ever see this
//! already-parsed tree of `key = value` pairs plus named child sections.
//! Accessors are lenient: an invalid value logs a warning and falls back to
//! the caller's default, so a bad config line degrades one store instead of
//! taking the process down.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    values: BTreeMap<String, String>,
    #[serde(default)]
    children: BTreeMap<String, StoreConfig>,
}

impl StoreConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Builder-style `set`, for assembling configs in tests.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set_child(&mut self, name: impl Into<String>, child: StoreConfig) {
        self.children.insert(name.into(), child);
    }

    /// Builder-style `set_child`.
    #[must_use]
    pub fn with_child(mut self, name: impl Into<String>, child: StoreConfig) -> Self {
        self.set_child(name, child);
        self
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Unsigned integer value, or `default` when absent or unparseable.
    pub fn uint(&self, key: &str, default: u64) -> u64 {
        match self.values.get(key) {
            None => default,
            Some(raw) => match raw.trim().parse() {
                Ok(v) => v,
                Err(_) => {
                    warn!(key, value = %raw, default, "ignoring non-numeric config value");
                    default
                }
            },
        }
    }

    /// Yes/no flag, or `default` when absent or unrecognized.
    pub fn flag(&self, key: &str, default: bool) -> bool {
        match self.values.get(key).map(String::as_str) {
            None => default,
            Some("yes") => true,
            Some("no") => false,
            Some(other) => {
                warn!(key, value = %other, default, "ignoring config flag that is not yes/no");
                default
            }
        }
    }

    pub fn child(&self, name: &str) -> Option<&StoreConfig> {
        self.children.get(name)
    }

    /// Children named `<prefix>0`, `<prefix>1`, ... in index order, stopping
    /// at the first missing index.
    pub fn indexed_children(&self, prefix: &str) -> Vec<&StoreConfig> {
        let mut found = Vec::new();
        for index in 0.. {
            match self.children.get(&format!("{prefix}{index}")) {
                Some(child) => found.push(child),
                None => break,
            }
        }
        found
    }

    pub fn has_child(&self, name: &str) -> bool {
        self.children.contains_key(name)
    }
}
