// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for the I/O seams of the store tree: the batch-forwarding
//! transport and its shared connection pool, dynamic endpoint resolution,
//! the external key-value sink client, and the fire-and-forget trigger
//! notifier. Each seam is a trait with a real implementation and a fake
//! for tests.

pub mod forward;
pub mod kv;
pub mod pool;
pub mod resolve;
pub mod traced;
pub mod trigger;

pub use forward::{Connection, Endpoint, NetError, TcpTransport, Transport};
pub use kv::{KvConn, KvConnector, KvError, RespConnector};
pub use pool::{ConnPool, PoolHandle};
pub use resolve::{DnsResolver, ResolveError, Resolver};
pub use traced::{TracedKvConnector, TracedTransport};
pub use trigger::{CommandNotifier, TriggerNotifier};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use forward::{FakeTransport, SentBatch};
#[cfg(any(test, feature = "test-support"))]
pub use kv::{FakeKvConnector, KvPush};
#[cfg(any(test, feature = "test-support"))]
pub use resolve::FakeResolver;
#[cfg(any(test, feature = "test-support"))]
pub use trigger::{FakeNotifier, TriggerCall};
