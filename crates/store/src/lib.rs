// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tributary-store: the composable store tree
//!
//! A store is one node in a routing tree for category-tagged log batches.
//! Terminal stores write to a medium (rotating files, a downstream daemon,
//! a key-value server, the void); combinator stores route, replicate,
//! partition, or buffer for their children. The tree is built once from
//! configuration by [`factory::build_store`] and driven from outside via
//! [`TreeHandle`]: batches through `handle_messages`, time through
//! `periodic_check`.

pub mod bucket;
pub mod buffer;
pub mod category;
pub mod context;
pub mod factory;
pub mod file;
pub mod framed;
pub mod kvsink;
pub mod multi;
pub mod network;
pub mod null;
pub mod root;
pub mod rotation;
pub mod store;

// Re-exports
pub use bucket::PartitionStore;
pub use buffer::BufferedFailoverStore;
pub use category::CategoryRouterStore;
pub use context::StoreContext;
pub use factory::{build_store, BuildError};
pub use file::FileSinkStore;
pub use framed::FramedFileStore;
pub use kvsink::KvSinkStore;
pub use multi::FanoutStore;
pub use network::NetworkForwardStore;
pub use null::DiscardStore;
pub use root::TreeHandle;
pub use store::{Store, StoreBase};
