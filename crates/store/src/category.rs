// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Routing by message category.
//!
//! A router holds one model configuration and spawns a child store per
//! distinct category it sees, each bound to that category via `copy`. The
//! model itself is never opened. A child is cached only once it opens
//! successfully, so a category whose store cannot open (bad path, remote
//! down) is retried from scratch on the next batch instead of pinning a
//! broken child forever.
//!
//! `multifile` and `thriftmultifile` are the same router with the model
//! implied: the file options sit directly on this store's config and every
//! child is a plain or framed file sink.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tracing::{info, warn};
use tributary_core::{Batch, StoreConfig};

use crate::context::StoreContext;
use crate::factory::build_store;
use crate::store::{mark_unhandled, Store, StoreBase};

pub struct CategoryRouterStore {
    base: StoreBase,
    ctx: StoreContext,
    config: StoreConfig,
    // set for multifile/thriftmultifile, where the model is implied
    inline_model_kind: Option<&'static str>,
    model: Option<Box<dyn Store>>,
    children: BTreeMap<String, Box<dyn Store>>,
}

impl CategoryRouterStore {
    pub fn new(
        ctx: StoreContext,
        category: &str,
        multi_category: bool,
        trigger_path: Option<String>,
    ) -> Self {
        Self::with_kind(ctx, "category", None, category, multi_category, trigger_path)
    }

    /// A router whose children are file sinks configured by this store's
    /// own options: plain lines, or framed records when `framed` is set.
    pub fn multi_sink(
        ctx: StoreContext,
        category: &str,
        multi_category: bool,
        trigger_path: Option<String>,
        framed: bool,
    ) -> Self {
        let (kind, model) = if framed {
            ("thriftmultifile", "thriftfile")
        } else {
            ("multifile", "file")
        };
        Self::with_kind(ctx, kind, Some(model), category, multi_category, trigger_path)
    }

    fn with_kind(
        ctx: StoreContext,
        kind: &str,
        inline_model_kind: Option<&'static str>,
        category: &str,
        multi_category: bool,
        trigger_path: Option<String>,
    ) -> Self {
        Self {
            base: StoreBase::new(kind, category, multi_category, trigger_path),
            ctx,
            config: StoreConfig::new(),
            inline_model_kind,
            model: None,
            children: BTreeMap::new(),
        }
    }

    fn build_model(&mut self, config: &StoreConfig) {
        let (kind, model_config) = match self.inline_model_kind {
            Some(kind) => (kind, config),
            None => {
                let Some(model_config) = config.child("model") else {
                    warn!(category = %self.base.category,
                        "category store missing a model");
                    self.base.set_status("Bad config - category store needs a model");
                    return;
                };
                let Some(kind) = model_config.str("type") else {
                    warn!(category = %self.base.category,
                        "category store model missing a type");
                    self.base.set_status("Bad config - model store missing a type");
                    return;
                };
                (kind, model_config)
            }
        };
        // children each own a single category, so the model is built
        // single-category regardless of what this router carries
        match build_store(
            &self.ctx,
            kind,
            &self.base.category,
            false,
            self.base.trigger_path.as_deref(),
            false,
            model_config,
        ) {
            Ok(model) => self.model = Some(model),
            Err(error) => {
                warn!(category = %self.base.category, error = %error,
                    "could not build category model");
                self.base.set_status("Bad config - could not build model store");
            }
        }
    }

    /// Opens (and caches) the child for `category`, creating it from the
    /// model on first sight. Returns false without caching when the child
    /// cannot open.
    async fn ensure_child(&mut self, category: &str) -> bool {
        if self.children.contains_key(category) {
            return true;
        }
        let Some(model) = &self.model else {
            return false;
        };
        let mut child = model.copy(category);
        if child.open().await {
            info!(category = %self.base.category, child_category = %category,
                "created store for new category");
            self.children.insert(category.to_string(), child);
            true
        } else {
            warn!(category = %self.base.category, child_category = %category,
                "could not open store for category");
            false
        }
    }
}

#[async_trait]
impl Store for CategoryRouterStore {
    fn base(&self) -> &StoreBase {
        &self.base
    }

    fn configure(&mut self, config: &StoreConfig) {
        self.config = config.clone();
        self.build_model(config);
    }

    async fn open(&mut self) -> bool {
        // children open lazily; the router is ready once it has a model
        self.model.is_some()
    }

    fn is_open(&self) -> bool {
        self.model.is_some()
    }

    async fn close(&mut self) {
        for child in self.children.values_mut() {
            child.close().await;
        }
        self.children.clear();
    }

    async fn handle_messages(&mut self, batch: &mut Batch) -> bool {
        if self.model.is_none() {
            return false;
        }
        if batch.is_empty() {
            return true;
        }

        let original = std::mem::take(batch);
        let mut unhandled = vec![false; original.len()];
        let mut routes: BTreeMap<&str, Vec<usize>> = BTreeMap::new();
        for (index, message) in original.iter().enumerate() {
            routes
                .entry(message.category.as_str())
                .or_default()
                .push(index);
        }

        for (category, indexes) in &routes {
            if !self.ensure_child(category).await {
                for &index in indexes {
                    unhandled[index] = true;
                }
                continue;
            }
            let Some(child) = self.children.get_mut(*category) else {
                continue;
            };
            let mut sub: Batch = indexes.iter().map(|&i| original[i].clone()).collect();
            if !child.handle_messages(&mut sub).await {
                mark_unhandled(&original, &sub, &mut unhandled);
            }
        }

        *batch = original
            .into_iter()
            .zip(unhandled)
            .filter_map(|(message, lost)| lost.then_some(message))
            .collect();
        batch.is_empty()
    }

    async fn periodic_check(&mut self) {
        for child in self.children.values_mut() {
            child.periodic_check().await;
        }
    }

    async fn flush(&mut self) {
        for child in self.children.values_mut() {
            child.flush().await;
        }
    }

    fn status(&self) -> String {
        let own = self.base.status.get();
        if !own.is_empty() {
            return own;
        }
        self.children
            .values()
            .map(|child| child.status())
            .find(|status| !status.is_empty())
            .unwrap_or_default()
    }

    fn copy(&self, category: &str) -> Box<dyn Store> {
        let mut copied = CategoryRouterStore::with_kind(
            self.ctx.clone(),
            &self.base.kind,
            self.inline_model_kind,
            category,
            self.base.multi_category,
            self.base.trigger_path.clone(),
        );
        copied.configure(&self.config);
        Box::new(copied)
    }
}

#[cfg(test)]
#[path = "category_tests.rs"]
mod tests;
