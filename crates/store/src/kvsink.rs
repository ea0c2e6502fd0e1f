// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! External key-value sink.
//!
//! Each message is pushed onto a list keyed by hour bucket and category, so
//! consumers can pop recent entries without scanning. The connection is
//! opened per batch and quit afterwards; there is nothing to keep warm.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Timelike, Utc};
use tracing::warn;
use tributary_adapters::{Endpoint, KvConn, KvConnector};
use tributary_core::{Batch, Clock, StoreConfig};

use crate::context::StoreContext;
use crate::store::{fire_triggers, Store, StoreBase};

const DEFAULT_KV_HOST: &str = "localhost";
const DEFAULT_KV_PORT: u16 = 6379;

pub struct KvSinkStore {
    base: StoreBase,
    ctx: StoreContext,
    config: StoreConfig,
    endpoint: Endpoint,
    opened: bool,
}

impl KvSinkStore {
    pub fn new(
        ctx: StoreContext,
        category: &str,
        multi_category: bool,
        trigger_path: Option<String>,
    ) -> Self {
        Self {
            base: StoreBase::new("redis", category, multi_category, trigger_path),
            ctx,
            config: StoreConfig::new(),
            endpoint: Endpoint::new(DEFAULT_KV_HOST, DEFAULT_KV_PORT),
            opened: false,
        }
    }

    /// List key for the current hour bucket: `log:YYYY:MM:DD:HH:<category>`.
    fn bucket_key(&self, now: DateTime<Utc>) -> String {
        format!(
            "log:{:04}:{:02}:{:02}:{:02}:{}",
            now.year(),
            now.month(),
            now.day(),
            now.hour(),
            self.base.category
        )
    }
}

#[async_trait]
impl Store for KvSinkStore {
    fn base(&self) -> &StoreBase {
        &self.base
    }

    fn configure(&mut self, config: &StoreConfig) {
        self.config = config.clone();
        self.endpoint = Endpoint::new(
            config.str("remote_host").unwrap_or(DEFAULT_KV_HOST),
            config.uint("remote_port", u64::from(DEFAULT_KV_PORT)) as u16,
        );
    }

    async fn open(&mut self) -> bool {
        // Connections are per batch; open only arms the store.
        self.opened = true;
        self.base.clear_status();
        true
    }

    fn is_open(&self) -> bool {
        self.opened
    }

    async fn close(&mut self) {
        self.opened = false;
    }

    async fn handle_messages(&mut self, batch: &mut Batch) -> bool {
        let key = self.bucket_key(self.ctx.clock.wall());

        let mut conn = match self.ctx.kv.connect(&self.endpoint).await {
            Ok(conn) => conn,
            Err(error) => {
                warn!(category = %self.base.category, endpoint = %self.endpoint,
                    error = %error, "key-value connect failed");
                self.base
                    .set_status(format!("KV connect to {} failed", self.endpoint));
                return false;
            }
        };

        for (index, message) in batch.iter().enumerate() {
            if let Err(error) = conn.push(&key, &message.payload).await {
                warn!(category = %self.base.category, key = %key, error = %error,
                    "key-value push failed");
                self.base.set_status("KV push error");
                conn.quit().await;
                batch.drain(..index);
                return false;
            }
        }

        conn.quit().await;
        self.base.clear_status();
        fire_triggers(&self.base, &self.ctx, batch);
        batch.clear();
        true
    }

    async fn periodic_check(&mut self) {}

    async fn flush(&mut self) {}

    fn copy(&self, category: &str) -> Box<dyn Store> {
        let mut copied = KvSinkStore::new(
            self.ctx.clone(),
            category,
            self.base.multi_category,
            self.base.trigger_path.clone(),
        );
        copied.configure(&self.config);
        Box::new(copied)
    }
}
