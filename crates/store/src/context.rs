// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared dependencies handed to every store at construction.
//!
//! The context carries the clock and every external collaborator behind its
//! adapter trait, so a whole tree can run against fakes in tests. Cloning
//! is cheap; clones share the same collaborators and the same connection
//! pool.

use std::sync::Arc;

use tributary_adapters::{
    CommandNotifier, ConnPool, DnsResolver, KvConnector, RespConnector, Resolver, TcpTransport,
    TracedKvConnector, TracedTransport, Transport, TriggerNotifier,
};
use tributary_core::{Clock, SystemClock};

#[derive(Clone)]
pub struct StoreContext {
    pub clock: Arc<dyn Clock>,
    pub transport: Arc<dyn Transport>,
    pub resolver: Arc<dyn Resolver>,
    pub kv: Arc<dyn KvConnector>,
    pub trigger: Arc<dyn TriggerNotifier>,
    pub pool: ConnPool,
}

impl StoreContext {
    pub fn new(
        clock: Arc<dyn Clock>,
        transport: Arc<dyn Transport>,
        resolver: Arc<dyn Resolver>,
        kv: Arc<dyn KvConnector>,
        trigger: Arc<dyn TriggerNotifier>,
    ) -> Self {
        Self {
            clock,
            transport,
            resolver,
            kv,
            trigger,
            pool: ConnPool::new(),
        }
    }

    /// Context wired to the real system: TCP forwarding, DNS resolution,
    /// RESP key-value client, detached trigger commands. The network
    /// adapters are wrapped for connection and send tracing.
    pub fn production() -> Self {
        Self::new(
            Arc::new(SystemClock),
            Arc::new(TracedTransport::new(TcpTransport::new())),
            Arc::new(DnsResolver::new()),
            Arc::new(TracedKvConnector::new(RespConnector::new())),
            Arc::new(CommandNotifier::new()),
        )
    }
}
