// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fire-and-forget trigger notifier.
//!
//! Stores with a trigger path configured invoke an external command per
//! handled message. The hook must never block message handling or affect
//! its result, so the real implementation detaches a task and forgets it.

use tracing::warn;

pub trait TriggerNotifier: Send + Sync {
    /// Notifies about one handled message. Returns immediately; the work
    /// happens on a detached task.
    fn notify(&self, path: &str, category: &str, payload: &[u8]);
}

/// Runs `<path> <category> <message>` as a detached child process.
#[derive(Debug, Clone, Default)]
pub struct CommandNotifier;

impl CommandNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl TriggerNotifier for CommandNotifier {
    fn notify(&self, path: &str, category: &str, payload: &[u8]) {
        let path = path.to_string();
        let category = category.to_string();
        let message = String::from_utf8_lossy(payload).into_owned();
        tokio::spawn(async move {
            match tokio::process::Command::new(&path)
                .arg(&category)
                .arg(&message)
                .status()
                .await
            {
                Ok(status) if !status.success() => {
                    warn!(path = %path, category = %category, code = ?status.code(),
                        "trigger command exited nonzero");
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(path = %path, category = %category, error = %e,
                        "trigger command failed to start");
                }
            }
        });
    }
}

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeNotifier, TriggerCall};

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use std::sync::{Arc, Mutex};

    use super::TriggerNotifier;

    /// One recorded trigger invocation.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct TriggerCall {
        pub path: String,
        pub category: String,
        pub payload: Vec<u8>,
    }

    /// Fake notifier recording every invocation.
    #[derive(Clone, Default)]
    pub struct FakeNotifier {
        calls: Arc<Mutex<Vec<TriggerCall>>>,
    }

    impl FakeNotifier {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn calls(&self) -> Vec<TriggerCall> {
            self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }
    }

    impl TriggerNotifier for FakeNotifier {
        fn notify(&self, path: &str, category: &str, payload: &[u8]) {
            self.calls
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .push(TriggerCall {
                    path: path.to_string(),
                    category: category.to_string(),
                    payload: payload.to_vec(),
                });
        }
    }
}
