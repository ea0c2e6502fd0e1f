// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Traced adapter wrappers for consistent observability

use std::time::Duration;

use async_trait::async_trait;
use tributary_core::Message;

use crate::forward::{Connection, Endpoint, NetError, Transport};
use crate::kv::{KvConn, KvConnector, KvError};

/// Wrapper that adds tracing to any Transport
#[derive(Clone)]
pub struct TracedTransport<T> {
    inner: T,
}

impl<T> TracedTransport<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<T: Transport> Transport for TracedTransport<T> {
    async fn connect(
        &self,
        endpoint: &Endpoint,
        timeout: Duration,
    ) -> Result<Box<dyn Connection>, NetError> {
        let start = std::time::Instant::now();
        let result = self.inner.connect(endpoint, timeout).await;
        let elapsed = start.elapsed();

        match result {
            Ok(conn) => {
                tracing::info!(endpoint = %endpoint,
                    elapsed_ms = elapsed.as_millis() as u64, "connected");
                Ok(Box::new(TracedConnection {
                    endpoint: endpoint.clone(),
                    inner: conn,
                }))
            }
            Err(e) => {
                tracing::error!(endpoint = %endpoint,
                    elapsed_ms = elapsed.as_millis() as u64, error = %e, "connect failed");
                Err(e)
            }
        }
    }
}

struct TracedConnection {
    endpoint: Endpoint,
    inner: Box<dyn Connection>,
}

#[async_trait]
impl Connection for TracedConnection {
    async fn send_batch(&mut self, batch: &[Message]) -> Result<(), NetError> {
        let result = self.inner.send_batch(batch).await;
        match &result {
            Ok(()) => tracing::debug!(endpoint = %self.endpoint,
                messages = batch.len(), "batch forwarded"),
            Err(e) => tracing::error!(endpoint = %self.endpoint,
                messages = batch.len(), error = %e, "batch forward failed"),
        }
        result
    }

    async fn shutdown(&mut self) {
        self.inner.shutdown().await;
        tracing::debug!(endpoint = %self.endpoint, "connection shut down");
    }
}

/// Wrapper that adds tracing to any KvConnector
#[derive(Clone)]
pub struct TracedKvConnector<K> {
    inner: K,
}

impl<K> TracedKvConnector<K> {
    pub fn new(inner: K) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<K: KvConnector> KvConnector for TracedKvConnector<K> {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn KvConn>, KvError> {
        let result = self.inner.connect(endpoint).await;
        match result {
            Ok(conn) => {
                tracing::debug!(endpoint = %endpoint, "kv connected");
                Ok(Box::new(TracedKvConn {
                    endpoint: endpoint.clone(),
                    inner: conn,
                }))
            }
            Err(e) => {
                tracing::error!(endpoint = %endpoint, error = %e, "kv connect failed");
                Err(e)
            }
        }
    }
}

struct TracedKvConn {
    endpoint: Endpoint,
    inner: Box<dyn KvConn>,
}

#[async_trait]
impl KvConn for TracedKvConn {
    async fn push(&mut self, key: &str, value: &[u8]) -> Result<(), KvError> {
        let result = self.inner.push(key, value).await;
        if let Err(e) = &result {
            tracing::error!(endpoint = %self.endpoint, key, error = %e, "kv push failed");
        }
        result
    }

    async fn quit(&mut self) {
        self.inner.quit().await;
    }
}

#[cfg(test)]
#[path = "traced_tests.rs"]
mod tests;
