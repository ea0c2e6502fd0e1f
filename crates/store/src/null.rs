// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Discard sink. Accepts and drops everything, and reports an always-empty
//! backlog so it can stand in anywhere a readable store is required.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;
use tributary_core::{Batch, Message, StoreConfig};

use crate::store::{Store, StoreBase};

pub struct DiscardStore {
    base: StoreBase,
}

impl DiscardStore {
    pub fn new(category: &str, multi_category: bool, trigger_path: Option<String>) -> Self {
        Self {
            base: StoreBase::new("null", category, multi_category, trigger_path),
        }
    }
}

#[async_trait]
impl Store for DiscardStore {
    fn base(&self) -> &StoreBase {
        &self.base
    }

    fn configure(&mut self, _config: &StoreConfig) {}

    async fn open(&mut self) -> bool {
        true
    }

    fn is_open(&self) -> bool {
        true
    }

    async fn close(&mut self) {}

    async fn handle_messages(&mut self, batch: &mut Batch) -> bool {
        debug!(category = %self.base.category, ignored = batch.len(), "discarding batch");
        batch.clear();
        true
    }

    async fn periodic_check(&mut self) {}

    async fn flush(&mut self) {}

    async fn read_oldest(&mut self) -> Option<Batch> {
        Some(Batch::new())
    }

    async fn replace_oldest(&mut self, _batch: &[Message]) -> bool {
        true
    }

    async fn delete_oldest(&mut self) -> bool {
        true
    }

    async fn empty(&mut self, _now: DateTime<Utc>) -> bool {
        true
    }

    fn copy(&self, category: &str) -> Box<dyn Store> {
        Box::new(DiscardStore::new(
            category,
            self.base.multi_category,
            self.base.trigger_path.clone(),
        ))
    }
}
