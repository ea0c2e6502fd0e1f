// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Batch forwarding transport
//!
//! A `Transport` dials a remote aggregation daemon; the resulting
//! `Connection` forwards whole batches. Delivery is all-or-nothing per
//! batch: any error means the caller must treat the entire batch as
//! undelivered.

mod tcp;

pub use tcp::TcpTransport;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeTransport, SentBatch};

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tributary_core::Message;

/// A remote daemon address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Errors from forwarding operations
#[derive(Debug, Error)]
pub enum NetError {
    #[error("connect timed out after {0:?}")]
    ConnectTimeout(Duration),
    #[error("not connected")]
    NotConnected,
    #[error("batch rejected by remote")]
    Rejected,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Dials remote endpoints.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        timeout: Duration,
    ) -> Result<Box<dyn Connection>, NetError>;
}

/// One live connection to a remote daemon.
#[async_trait]
pub trait Connection: Send {
    /// Forwards the batch; `Err` means none of it may be counted as
    /// delivered.
    async fn send_batch(&mut self, batch: &[Message]) -> Result<(), NetError>;

    /// Best-effort teardown.
    async fn shutdown(&mut self);
}
