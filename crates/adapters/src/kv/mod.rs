// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External key-value sink client.
//!
//! The key-value sink store pushes each message onto a list keyed by time
//! bucket and category. Connections are short-lived: one per batch, opened
//! and quit by the store.

mod resp;

pub use resp::RespConnector;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeKvConnector, KvPush};

use async_trait::async_trait;
use thiserror::Error;

use crate::forward::Endpoint;

/// Errors from key-value operations
#[derive(Debug, Error)]
pub enum KvError {
    #[error("server error: {0}")]
    Server(String),
    #[error("malformed server reply")]
    MalformedReply,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Dials the key-value server.
#[async_trait]
pub trait KvConnector: Send + Sync {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn KvConn>, KvError>;
}

/// One live key-value connection.
#[async_trait]
pub trait KvConn: Send {
    /// Pushes one value onto the list at `key`.
    async fn push(&mut self, key: &str, value: &[u8]) -> Result<(), KvError>;

    /// Polite teardown; errors are ignored.
    async fn quit(&mut self);
}
