// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The store contract every node in the tree implements.
//!
//! One trait covers both terminal sinks and combinators. The operational
//! surface is deliberately boolean: `open` and `handle_messages` report
//! success or failure, details go to the node's status cell and the log,
//! and nothing here ever panics or propagates an error past a node. On a
//! failed `handle_messages` the batch is mutated in place to hold exactly
//! the unhandled messages, in their original order, so the caller can
//! retry or spill precisely what is still at risk.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::warn;
use tributary_adapters::TriggerNotifier;
use tributary_core::{Batch, Message, StatusCell, StoreConfig};

use crate::context::StoreContext;

/// Fields shared by every store variant.
#[derive(Debug, Clone)]
pub struct StoreBase {
    pub category: String,
    pub kind: String,
    pub multi_category: bool,
    pub trigger_path: Option<String>,
    pub status: StatusCell,
}

impl StoreBase {
    pub fn new(
        kind: &str,
        category: &str,
        multi_category: bool,
        trigger_path: Option<String>,
    ) -> Self {
        Self {
            category: category.to_string(),
            kind: kind.to_string(),
            multi_category,
            trigger_path,
            status: StatusCell::new(),
        }
    }

    pub fn set_status(&self, message: impl Into<String>) {
        self.status.set(message);
    }

    pub fn clear_status(&self) {
        self.status.clear();
    }
}

#[async_trait]
pub trait Store: Send {
    fn base(&self) -> &StoreBase;

    /// Applies recognized options, with documented defaults for the rest.
    /// Never fails: a bad value degrades this node (status + log) only.
    fn configure(&mut self, config: &StoreConfig);

    /// Readies the sink. Idempotent; failure sets status and returns false.
    async fn open(&mut self) -> bool;

    fn is_open(&self) -> bool;

    async fn close(&mut self);

    /// Attempts to persist or forward every message in the batch.
    ///
    /// `true` means the whole batch is handled and the caller must not
    /// retry it. On `false` the batch holds only the unhandled subset, in
    /// original relative order.
    async fn handle_messages(&mut self, batch: &mut Batch) -> bool;

    /// Rotation, retry and flush bookkeeping, driven at a fixed external
    /// cadence. Must not block on unbounded I/O.
    async fn periodic_check(&mut self);

    /// Best-effort durability push.
    async fn flush(&mut self);

    /// Reads the oldest replayable backlog entry. Only spill targets
    /// support this; everything else signals misuse.
    async fn read_oldest(&mut self) -> Option<Batch> {
        warn!(category = %self.base().category, kind = %self.base().kind,
            "attempting to read from a write-only store");
        None
    }

    /// Rewrites the entry `read_oldest` returned with the given remainder.
    async fn replace_oldest(&mut self, _batch: &[Message]) -> bool {
        warn!(category = %self.base().category, kind = %self.base().kind,
            "attempting to write back to a write-only store");
        false
    }

    /// Discards the entry `read_oldest` returned.
    async fn delete_oldest(&mut self) -> bool {
        warn!(category = %self.base().category, kind = %self.base().kind,
            "attempting to delete from a write-only store");
        false
    }

    /// Whether no replayable backlog remains as of `now`. Write-only
    /// stores signal misuse and report empty.
    async fn empty(&mut self, _now: DateTime<Utc>) -> bool {
        warn!(category = %self.base().category, kind = %self.base().kind,
            "attempting to read from a write-only store");
        true
    }

    /// A fresh, unopened store with identical static configuration bound
    /// to `category`. Shares no mutable state with the original.
    fn copy(&self, category: &str) -> Box<dyn Store>;

    /// Human-readable health line; empty means healthy.
    fn status(&self) -> String {
        self.base().status.get()
    }

    fn kind(&self) -> &str {
        &self.base().kind
    }

    fn category(&self) -> &str {
        &self.base().category
    }
}

/// Fires the configured trigger hook once per handled message.
///
/// Terminal stores that locally persisted a batch call this; combinators
/// never do (their children already did).
pub(crate) fn fire_triggers(base: &StoreBase, ctx: &StoreContext, messages: &[Message]) {
    if let Some(path) = &base.trigger_path {
        for message in messages {
            ctx.trigger.notify(path, &message.category, &message.payload);
        }
    }
}

/// Combinator status: the node's own failure line if set, otherwise the
/// non-empty child statuses joined.
pub(crate) fn aggregate_status(own: &StatusCell, children: &[Box<dyn Store>]) -> String {
    let own_status = own.get();
    if !own_status.is_empty() {
        return own_status;
    }
    children
        .iter()
        .map(|child| child.status())
        .filter(|status| !status.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Marks which positions of `original` a child left unhandled, given the
/// remainder it mutated its batch down to. The remainder is an ordered
/// subsequence of `original`, so a single greedy pass suffices.
pub(crate) fn mark_unhandled(original: &[Message], remainder: &[Message], unhandled: &mut [bool]) {
    let mut next = 0;
    for (index, message) in original.iter().enumerate() {
        if next < remainder.len() && *message == remainder[next] {
            unhandled[index] = true;
            next += 1;
        }
    }
}
