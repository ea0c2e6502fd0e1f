// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Store construction by configured type name.
//!
//! Combinators call back in here for their children, so one entry point
//! covers the whole tree. The returned store is already configured; the
//! caller decides when to open it.

use thiserror::Error;
use tracing::debug;
use tributary_core::StoreConfig;

use crate::bucket::PartitionStore;
use crate::buffer::BufferedFailoverStore;
use crate::category::CategoryRouterStore;
use crate::context::StoreContext;
use crate::file::FileSinkStore;
use crate::framed::FramedFileStore;
use crate::kvsink::KvSinkStore;
use crate::multi::FanoutStore;
use crate::network::NetworkForwardStore;
use crate::null::DiscardStore;
use crate::store::Store;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("unknown store type `{0}`")]
    UnknownKind(String),
}

/// Builds and configures a store of the given type.
///
/// `readable` asks for a store that supports the backlog-replay calls;
/// only the plain file sink changes shape for it (framed files always
/// support replay). `multi_category` and `trigger_path` are threaded
/// through to every child a combinator creates.
pub fn build_store(
    ctx: &StoreContext,
    kind: &str,
    category: &str,
    multi_category: bool,
    trigger_path: Option<&str>,
    readable: bool,
    config: &StoreConfig,
) -> Result<Box<dyn Store>, BuildError> {
    debug!(kind, category, readable, "building store");
    let trigger = trigger_path.map(str::to_string);
    let mut store: Box<dyn Store> = match kind {
        "file" => Box::new(FileSinkStore::new(
            ctx.clone(),
            category,
            multi_category,
            trigger,
            readable,
        )),
        "thriftfile" => Box::new(FramedFileStore::new(
            ctx.clone(),
            category,
            multi_category,
            trigger,
        )),
        "buffer" => Box::new(BufferedFailoverStore::new(
            ctx.clone(),
            category,
            multi_category,
            trigger,
        )),
        "network" => Box::new(NetworkForwardStore::new(
            ctx.clone(),
            category,
            multi_category,
            trigger,
        )),
        "bucket" => Box::new(PartitionStore::new(
            ctx.clone(),
            category,
            multi_category,
            trigger,
        )),
        "null" => Box::new(DiscardStore::new(category, multi_category, trigger)),
        "multi" => Box::new(FanoutStore::new(
            ctx.clone(),
            category,
            multi_category,
            trigger,
        )),
        "category" => Box::new(CategoryRouterStore::new(
            ctx.clone(),
            category,
            multi_category,
            trigger,
        )),
        "multifile" => Box::new(CategoryRouterStore::multi_sink(
            ctx.clone(),
            category,
            multi_category,
            trigger,
            false,
        )),
        "thriftmultifile" => Box::new(CategoryRouterStore::multi_sink(
            ctx.clone(),
            category,
            multi_category,
            trigger,
            true,
        )),
        "redis" => Box::new(KvSinkStore::new(
            ctx.clone(),
            category,
            multi_category,
            trigger,
        )),
        other => return Err(BuildError::UnknownKind(other.to_string())),
    };
    store.configure(config);
    Ok(store)
}
