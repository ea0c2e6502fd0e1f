// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake key-value connector for tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{KvConn, KvConnector, KvError};
use crate::forward::Endpoint;

/// One recorded push.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvPush {
    pub endpoint: Endpoint,
    pub key: String,
    pub value: Vec<u8>,
}

#[derive(Default)]
struct FakeState {
    refuse_connects: bool,
    // None means every push succeeds; Some(n) means n more succeed, then fail.
    push_budget: Option<usize>,
    connect_attempts: usize,
    pushes: Vec<KvPush>,
}

#[derive(Clone, Default)]
pub struct FakeKvConnector {
    state: Arc<Mutex<FakeState>>,
}

impl FakeKvConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refuse_connects(&self, refuse: bool) {
        self.lock().refuse_connects = refuse;
    }

    pub fn fail_pushes(&self, fail: bool) {
        self.lock().push_budget = if fail { Some(0) } else { None };
    }

    /// The next `successes` pushes succeed, every later one fails.
    pub fn fail_pushes_after(&self, successes: usize) {
        self.lock().push_budget = Some(successes);
    }

    pub fn connect_attempts(&self) -> usize {
        self.lock().connect_attempts
    }

    pub fn pushes(&self) -> Vec<KvPush> {
        self.lock().pushes.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl KvConnector for FakeKvConnector {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn KvConn>, KvError> {
        let mut state = self.lock();
        state.connect_attempts += 1;
        if state.refuse_connects {
            return Err(KvError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "refused by fake connector",
            )));
        }
        Ok(Box::new(FakeKvConn {
            endpoint: endpoint.clone(),
            state: Arc::clone(&self.state),
        }))
    }
}

struct FakeKvConn {
    endpoint: Endpoint,
    state: Arc<Mutex<FakeState>>,
}

#[async_trait]
impl KvConn for FakeKvConn {
    async fn push(&mut self, key: &str, value: &[u8]) -> Result<(), KvError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(budget) = state.push_budget.as_mut() {
            if *budget == 0 {
                return Err(KvError::Server("push failed by fake connector".into()));
            }
            *budget -= 1;
        }
        state.pushes.push(KvPush {
            endpoint: self.endpoint.clone(),
            key: key.to_string(),
            value: value.to_vec(),
        });
        Ok(())
    }

    async fn quit(&mut self) {}
}
