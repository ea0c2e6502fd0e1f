// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake transport for tests: records every delivered batch and can be
//! programmed to refuse connects or fail sends mid-stream.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tributary_core::Message;

use super::{Connection, Endpoint, NetError, Transport};

/// One batch a fake connection accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentBatch {
    pub endpoint: Endpoint,
    pub messages: Vec<Message>,
}

#[derive(Default)]
struct FakeState {
    refuse_connects: bool,
    refused_hosts: HashSet<String>,
    fail_sends: bool,
    connect_attempts: usize,
    sent: Vec<SentBatch>,
}

#[derive(Clone, Default)]
pub struct FakeTransport {
    state: Arc<Mutex<FakeState>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, `connect` fails with a refused error.
    pub fn refuse_connects(&self, refuse: bool) {
        self.lock().refuse_connects = refuse;
    }

    /// Refuses connects to one host while others keep working.
    pub fn refuse_host(&self, host: &str) {
        self.lock().refused_hosts.insert(host.to_string());
    }

    /// When set, every `send_batch` on live connections fails.
    pub fn fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }

    pub fn connect_attempts(&self) -> usize {
        self.lock().connect_attempts
    }

    /// All batches delivered so far, across every connection.
    pub fn sent(&self) -> Vec<SentBatch> {
        self.lock().sent.clone()
    }

    /// Flattened messages delivered so far.
    pub fn sent_messages(&self) -> Vec<Message> {
        self.lock()
            .sent
            .iter()
            .flat_map(|batch| batch.messages.clone())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        _timeout: Duration,
    ) -> Result<Box<dyn Connection>, NetError> {
        let mut state = self.lock();
        state.connect_attempts += 1;
        if state.refuse_connects || state.refused_hosts.contains(&endpoint.host) {
            return Err(NetError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                "refused by fake transport",
            )));
        }
        Ok(Box::new(FakeConnection {
            endpoint: endpoint.clone(),
            state: Arc::clone(&self.state),
            open: true,
        }))
    }
}

struct FakeConnection {
    endpoint: Endpoint,
    state: Arc<Mutex<FakeState>>,
    open: bool,
}

#[async_trait]
impl Connection for FakeConnection {
    async fn send_batch(&mut self, batch: &[Message]) -> Result<(), NetError> {
        if !self.open {
            return Err(NetError::NotConnected);
        }
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if state.fail_sends {
            return Err(NetError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "send failed by fake transport",
            )));
        }
        state.sent.push(SentBatch {
            endpoint: self.endpoint.clone(),
            messages: batch.to_vec(),
        });
        Ok(())
    }

    async fn shutdown(&mut self) {
        self.open = false;
    }
}
