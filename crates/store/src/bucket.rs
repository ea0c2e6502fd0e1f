// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Deterministic partitioning across N children.
//!
//! Bucket 0 is the overflow child: messages whose key cannot be extracted
//! land there instead of being dropped. Keyed variants take the payload
//! prefix before the first delimiter; `remove_key` strips that prefix
//! before forwarding, and failed sub-batches are mapped back to their
//! original, unstripped form so a retry routes identically.

use async_trait::async_trait;
use rand::Rng;
use tracing::warn;
use tributary_core::{Batch, Message, StoreConfig};

use crate::context::StoreContext;
use crate::factory::build_store;
use crate::store::{aggregate_status, Store, StoreBase};

const DEFAULT_DELIMITER: u8 = b':';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BucketKind {
    ContextLog,
    Random,
    KeyHash,
    KeyModulo,
    KeyRange,
}

impl BucketKind {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "context_log" => Some(Self::ContextLog),
            "random" => Some(Self::Random),
            "key_hash" => Some(Self::KeyHash),
            "key_modulo" => Some(Self::KeyModulo),
            "key_range" => Some(Self::KeyRange),
            _ => None,
        }
    }

    /// Only the keyed variants ever strip the routing prefix.
    fn keyed(self) -> bool {
        matches!(self, Self::KeyHash | Self::KeyModulo | Self::KeyRange)
    }
}

/// Leading unsigned decimal value of `bytes`, `atol`-style: skips leading
/// whitespace, stops at the first non-digit, absent digits mean zero.
fn leading_u64(bytes: &[u8]) -> u64 {
    let mut value: u64 = 0;
    for byte in bytes.iter().skip_while(|b| b.is_ascii_whitespace()) {
        match byte {
            b'0'..=b'9' => {
                value = value
                    .saturating_mul(10)
                    .saturating_add(u64::from(byte - b'0'));
            }
            _ => break,
        }
    }
    value
}

pub struct PartitionStore {
    base: StoreBase,
    ctx: StoreContext,
    config: StoreConfig,
    children: Vec<Box<dyn Store>>,
    bucket_kind: Option<BucketKind>,
    num_buckets: u64,
    bucket_range: u64,
    delimiter: u8,
    remove_key: bool,
}

impl PartitionStore {
    pub fn new(
        ctx: StoreContext,
        category: &str,
        multi_category: bool,
        trigger_path: Option<String>,
    ) -> Self {
        Self {
            base: StoreBase::new("bucket", category, multi_category, trigger_path),
            ctx,
            config: StoreConfig::new(),
            children: Vec::new(),
            bucket_kind: None,
            num_buckets: 1,
            bucket_range: 0,
            delimiter: DEFAULT_DELIMITER,
            remove_key: false,
        }
    }

    fn child_category(&self, index: u64) -> String {
        format!("{}_{:03}", self.base.category, index)
    }

    fn build_children(&mut self, config: &StoreConfig) {
        self.children.clear();
        if let Some(prototype) = config.child("bucket") {
            let Some(child_type) = prototype.str("type") else {
                warn!(category = %self.base.category, "bucket prototype missing a type");
                self.base.set_status("Bad config - bucket prototype missing a type");
                return;
            };
            let model = match build_store(
                &self.ctx,
                child_type,
                &self.base.category,
                self.base.multi_category,
                self.base.trigger_path.as_deref(),
                false,
                prototype,
            ) {
                Ok(model) => model,
                Err(error) => {
                    warn!(category = %self.base.category, error = %error,
                        "could not build bucket prototype");
                    self.base.set_status("Bad config - could not build bucket prototype");
                    return;
                }
            };
            for index in 0..=self.num_buckets {
                self.children.push(model.copy(&self.child_category(index)));
            }
            return;
        }

        for index in 0..=self.num_buckets {
            let name = format!("bucket{index}");
            let Some(child_config) = config.child(&name) else {
                warn!(category = %self.base.category, bucket = %name,
                    "bucket store missing a child");
                self.base
                    .set_status(format!("Bad config - missing {name}"));
                self.children.clear();
                return;
            };
            let Some(child_type) = child_config.str("type") else {
                warn!(category = %self.base.category, bucket = %name,
                    "bucket child missing a type");
                self.base
                    .set_status(format!("Bad config - {name} missing a type"));
                self.children.clear();
                return;
            };
            match build_store(
                &self.ctx,
                child_type,
                &self.child_category(index),
                self.base.multi_category,
                self.base.trigger_path.as_deref(),
                false,
                child_config,
            ) {
                Ok(child) => self.children.push(child),
                Err(error) => {
                    warn!(category = %self.base.category, bucket = %name,
                        error = %error, "could not build bucket child");
                    self.base
                        .set_status(format!("Bad config - could not build {name}"));
                    self.children.clear();
                    return;
                }
            }
        }
    }

    /// Child index for a message: 0 is the overflow bucket, 1..=N the keyed
    /// buckets. Deterministic for everything except `random`.
    fn bucketize(&self, message: &Message) -> usize {
        let Some(kind) = self.bucket_kind else {
            return 0;
        };
        let n = self.num_buckets;
        let bucket = match kind {
            BucketKind::Random => rand::thread_rng().gen_range(0..n) + 1,
            BucketKind::KeyHash => match message.key(self.delimiter) {
                None => 0,
                Some(key) => u64::from(crc32fast::hash(key)) % n + 1,
            },
            BucketKind::KeyModulo => match message.key(self.delimiter) {
                None => 0,
                Some(key) => leading_u64(key) % n + 1,
            },
            BucketKind::KeyRange => match message.key(self.delimiter) {
                None => 0,
                Some(_) if self.bucket_range == 0 => 0,
                Some(key) => (leading_u64(key) / self.bucket_range) % n + 1,
            },
            BucketKind::ContextLog => self.context_bucket(message, n),
        };
        bucket as usize
    }

    /// The context id sits after the third `:` of the payload; a missing or
    /// zero id goes to the overflow bucket. The id is hashed over its
    /// little-endian bytes so ids cluster evenly regardless of magnitude.
    fn context_bucket(&self, message: &Message, n: u64) -> u64 {
        let mut colons = 0;
        let mut start = None;
        for (index, byte) in message.payload.iter().enumerate() {
            if *byte == b':' {
                colons += 1;
                if colons == 3 {
                    start = Some(index + 1);
                    break;
                }
            }
        }
        let Some(start) = start else {
            return 0;
        };
        let id = leading_u64(&message.payload[start..]);
        if id == 0 {
            return 0;
        }
        u64::from(crc32fast::hash(&id.to_le_bytes())) % n + 1
    }
}

#[async_trait]
impl Store for PartitionStore {
    fn base(&self) -> &StoreBase {
        &self.base
    }

    fn configure(&mut self, config: &StoreConfig) {
        self.config = config.clone();
        self.num_buckets = config.uint("num_buckets", 1);
        self.bucket_range = config.uint("bucket_range", 0);
        self.remove_key = config.flag("remove_key", false);
        if let Some(value) = config.str("delimiter") {
            if value.len() != 1 {
                warn!(category = %self.base.category, value = %value,
                    "delimiter must be one character, using the first");
            }
            self.delimiter = value.as_bytes().first().copied().unwrap_or(DEFAULT_DELIMITER);
        }

        self.bucket_kind = config.str("bucket_type").and_then(BucketKind::parse);
        if self.bucket_kind.is_none() {
            warn!(category = %self.base.category,
                value = config.str("bucket_type").unwrap_or(""),
                "bucket store needs a valid bucket_type");
            self.base
                .set_status("Bad config - bucket store needs a valid bucket_type");
            return;
        }
        if self.num_buckets == 0 {
            warn!(category = %self.base.category, "bucket store needs num_buckets");
            self.base
                .set_status("Bad config - bucket store needs num_buckets");
            return;
        }
        self.build_children(config);
    }

    async fn open(&mut self) -> bool {
        // all-or-nothing, but every child still gets its attempt so each
        // failure lands in that child's status
        let mut ok = !self.children.is_empty();
        for child in &mut self.children {
            ok &= child.open().await;
        }
        ok
    }

    fn is_open(&self) -> bool {
        !self.children.is_empty() && self.children.iter().all(|child| child.is_open())
    }

    async fn close(&mut self) {
        for child in &mut self.children {
            child.close().await;
        }
    }

    async fn handle_messages(&mut self, batch: &mut Batch) -> bool {
        if self.children.is_empty() {
            warn!(category = %self.base.category, "no bucket children to handle batch");
            return false;
        }

        let original = std::mem::take(batch);
        let mut grouped: Vec<Vec<(Message, Message)>> = Vec::new();
        grouped.resize_with(self.children.len(), Vec::new);
        for message in original {
            let bucket = self.bucketize(&message);
            let strip = self.remove_key
                && bucket != 0
                && self.bucket_kind.is_some_and(BucketKind::keyed);
            let forward = if strip {
                message.without_key(self.delimiter)
            } else {
                message.clone()
            };
            grouped[bucket].push((message, forward));
        }

        let mut failed: Vec<Message> = Vec::new();
        let mut ok = true;
        for (bucket, pairs) in grouped.into_iter().enumerate() {
            if pairs.is_empty() {
                continue;
            }
            let mut sub: Batch = pairs.iter().map(|(_, forward)| forward.clone()).collect();
            if self.children[bucket].handle_messages(&mut sub).await {
                continue;
            }
            ok = false;
            let mut next = 0;
            for (original, forward) in pairs {
                if next < sub.len() && forward == sub[next] {
                    failed.push(original);
                    next += 1;
                }
            }
        }

        if ok {
            return true;
        }
        *batch = failed;
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
        let mut copied = PartitionStore::new(
            self.ctx.clone(),
            category,
            self.base.multi_category,
            self.base.trigger_path.clone(),
        );
        copied.configure(&self.config);
        Box::new(copied)
    }
}

#[cfg(test)]
#[path = "bucket_tests.rs"]
mod tests;
