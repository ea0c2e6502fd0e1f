// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fanout to several children.
//!
//! Every child sees the whole batch. `report_success` picks the policy:
//! `all` (default) holds the batch unhandled unless every child takes it,
//! `any` settles for one copy landing somewhere. Either way the failed
//! remainder is the union of what the failing children left, in original
//! order, so nothing a child missed is dropped on the floor.

use async_trait::async_trait;
use tracing::warn;
use tributary_core::{Batch, StoreConfig};

use crate::context::StoreContext;
use crate::factory::build_store;
use crate::store::{aggregate_status, mark_unhandled, Store, StoreBase};

pub struct FanoutStore {
    base: StoreBase,
    ctx: StoreContext,
    config: StoreConfig,
    children: Vec<Box<dyn Store>>,
    success_all: bool,
}

impl FanoutStore {
    pub fn new(
        ctx: StoreContext,
        category: &str,
        multi_category: bool,
        trigger_path: Option<String>,
    ) -> Self {
        Self {
            base: StoreBase::new("multi", category, multi_category, trigger_path),
            ctx,
            config: StoreConfig::new(),
            children: Vec::new(),
            success_all: true,
        }
    }
}

#[async_trait]
impl Store for FanoutStore {
    fn base(&self) -> &StoreBase {
        &self.base
    }

    fn configure(&mut self, config: &StoreConfig) {
        self.config = config.clone();
        self.success_all = match config.str("report_success") {
            None | Some("all") => true,
            Some("any") => false,
            Some(other) => {
                warn!(category = %self.base.category, value = %other,
                    "report_success must be any or all, using all");
                true
            }
        };

        self.children.clear();
        for child_config in config.indexed_children("store") {
            let Some(kind) = child_config.str("type") else {
                warn!(category = %self.base.category, "fanout child missing a type");
                self.base.set_status("Bad config - fanout child missing a type");
                continue;
            };
            match build_store(
                &self.ctx,
                kind,
                &self.base.category,
                self.base.multi_category,
                self.base.trigger_path.as_deref(),
                false,
                child_config,
            ) {
                Ok(child) => self.children.push(child),
                Err(error) => {
                    warn!(category = %self.base.category, error = %error,
                        "could not build fanout child");
                    self.base.set_status("Bad config - could not build fanout child");
                }
            }
        }
        if self.children.is_empty() {
            warn!(category = %self.base.category, "fanout store has no children");
            self.base.set_status("Bad config - no stores configured");
        }
    }

    async fn open(&mut self) -> bool {
        let mut any = false;
        let mut all = true;
        for child in &mut self.children {
            let ok = child.open().await;
            any |= ok;
            all &= ok;
        }
        if self.success_all {
            all && !self.children.is_empty()
        } else {
            any
        }
    }

    fn is_open(&self) -> bool {
        if self.success_all {
            !self.children.is_empty() && self.children.iter().all(|child| child.is_open())
        } else {
            self.children.iter().any(|child| child.is_open())
        }
    }

    async fn close(&mut self) {
        for child in &mut self.children {
            child.close().await;
        }
    }

    async fn handle_messages(&mut self, batch: &mut Batch) -> bool {
        if self.children.is_empty() {
            warn!(category = %self.base.category, "no fanout children to handle batch");
            return false;
        }

        let original = std::mem::take(batch);
        let mut unhandled = vec![false; original.len()];
        let mut any_ok = false;
        let mut all_ok = true;

        for child in &mut self.children {
            let mut child_batch = original.clone();
            if child.handle_messages(&mut child_batch).await {
                any_ok = true;
            } else {
                all_ok = false;
                mark_unhandled(&original, &child_batch, &mut unhandled);
            }
        }

        if if self.success_all { all_ok } else { any_ok } {
            return true;
        }
        *batch = original
            .into_iter()
            .zip(unhandled)
            .filter_map(|(message, lost)| lost.then_some(message))
            .collect();
        false
    }

    async fn periodic_check(&mut self) {
        for child in &mut self.children {
            child.periodic_check().await;
        }
    }

    async fn flush(&mut self) {
        for child in &mut self.children {
            child.flush().await;
        }
    }

    fn status(&self) -> String {
        aggregate_status(&self.base.status, &self.children)
    }

    fn copy(&self, category: &str) -> Box<dyn Store> {
        let mut copied = FanoutStore::new(
            self.ctx.clone(),
            category,
            self.base.multi_category,
            self.base.trigger_path.clone(),
        );
        copied.config = self.config.clone();
        copied.success_all = self.success_all;
        copied.children = self.children.iter().map(|child| child.copy(category)).collect();
        Box::new(copied)
    }
}
