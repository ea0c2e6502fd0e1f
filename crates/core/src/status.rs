// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronized status string.
//!
//! Every store node exposes one human-readable status line for monitoring.
//! It is the single field read concurrently with writers on other call
//! paths, so it lives behind its own lock; an empty string means healthy.

use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct StatusCell {
    inner: Arc<Mutex<String>>,
}

impl StatusCell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the most recent failure description.
    pub fn set(&self, message: impl Into<String>) {
        let mut status = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *status = message.into();
    }

    /// Mark healthy.
    pub fn clear(&self) {
        self.set(String::new());
    }

    pub fn get(&self) -> String {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_healthy(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_empty()
    }
}
