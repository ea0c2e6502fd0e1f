// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Buffered failover around a primary store.
//!
//! While the primary is healthy every batch streams straight through.
//! When it fails, writes spill to a readable secondary and a jittered
//! retry timer starts; once the primary comes back the backlog is drained
//! oldest-first, deleting an entry only after the primary confirms it.
//! Messages read but not sent go back via `replace_oldest`, so a crash
//! mid-drain re-sends rather than drops.
//!
//! At most one of the two children accepts fresh writes at any moment.

use std::fmt;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rand::Rng;
use tracing::{debug, error, info, warn};
use tributary_core::{Batch, Clock, StoreConfig};

use crate::context::StoreContext;
use crate::factory::build_store;
use crate::store::{Store, StoreBase};

const DEFAULT_MAX_QUEUE_LENGTH: u64 = 2_000_000;
const DEFAULT_BUFFER_SEND_RATE: u64 = 1;
const DEFAULT_RETRY_INTERVAL_SECS: u64 = 300;
const DEFAULT_RETRY_RANGE_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BufferState {
    Streaming,
    Disconnected,
    SendingBuffer,
}

impl fmt::Display for BufferState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BufferState::Streaming => "streaming",
            BufferState::Disconnected => "disconnected",
            BufferState::SendingBuffer => "sending_buffer",
        })
    }
}

pub struct BufferedFailoverStore {
    base: StoreBase,
    ctx: StoreContext,
    config: StoreConfig,
    primary: Option<Box<dyn Store>>,
    secondary: Option<Box<dyn Store>>,
    state: BufferState,
    max_queue_length: u64,
    buffer_send_rate: u64,
    avg_retry_interval: u64,
    retry_interval_range: u64,
    replay_buffer: bool,
    // spilled-message count; approximate backpressure, not an exact ledger
    backlog: u64,
    retry_at: Instant,
}

impl BufferedFailoverStore {
    pub fn new(
        ctx: StoreContext,
        category: &str,
        multi_category: bool,
        trigger_path: Option<String>,
    ) -> Self {
        let retry_at = ctx.clock.now();
        Self {
            base: StoreBase::new("buffer", category, multi_category, trigger_path),
            ctx,
            config: StoreConfig::new(),
            primary: None,
            secondary: None,
            state: BufferState::Disconnected,
            max_queue_length: DEFAULT_MAX_QUEUE_LENGTH,
            buffer_send_rate: DEFAULT_BUFFER_SEND_RATE,
            avg_retry_interval: DEFAULT_RETRY_INTERVAL_SECS,
            retry_interval_range: DEFAULT_RETRY_RANGE_SECS,
            replay_buffer: true,
            backlog: 0,
            retry_at,
        }
    }

    fn change_state(&mut self, to: BufferState) {
        if self.state == to {
            return;
        }
        info!(category = %self.base.category, from = %self.state, to = %to,
            "buffer state change");
        self.state = to;
    }

    fn sample_retry(&mut self) {
        let low = self.avg_retry_interval.saturating_sub(self.retry_interval_range);
        let high = self.avg_retry_interval.saturating_add(self.retry_interval_range);
        let secs = rand::thread_rng().gen_range(low..=high);
        self.retry_at = self.ctx.clock.now() + Duration::from_secs(secs);
        debug!(category = %self.base.category, retry_in_secs = secs,
            "scheduled primary retry");
    }

    fn build_child(&mut self, config: &StoreConfig, name: &str, readable: bool) -> Option<Box<dyn Store>> {
        let Some(child_config) = config.child(name) else {
            warn!(category = %self.base.category, child = %name,
                "buffer store missing a child");
            self.base.set_status(format!("Bad config - buffer needs a {name} store"));
            return None;
        };
        let Some(kind) = child_config.str("type") else {
            warn!(category = %self.base.category, child = %name,
                "buffer child missing a type");
            self.base.set_status(format!("Bad config - {name} store missing a type"));
            return None;
        };
        match build_store(
            &self.ctx,
            kind,
            &self.base.category,
            self.base.multi_category,
            self.base.trigger_path.as_deref(),
            readable,
            child_config,
        ) {
            Ok(child) => Some(child),
            Err(error) => {
                warn!(category = %self.base.category, child = %name, error = %error,
                    "could not build buffer child");
                self.base.set_status(format!("Bad config - could not build {name} store"));
                None
            }
        }
    }

    /// Writes the batch to the secondary, honoring the queue bound.
    async fn spill(&mut self, batch: &mut Batch) -> bool {
        if batch.is_empty() {
            return true;
        }
        let incoming = batch.len() as u64;
        if self.backlog.saturating_add(incoming) > self.max_queue_length {
            warn!(category = %self.base.category, backlog = self.backlog, incoming,
                limit = self.max_queue_length, "buffer queue full, rejecting batch");
            self.base.set_status("Buffer queue is full");
            return false;
        }
        let Some(secondary) = self.secondary.as_mut() else {
            return false;
        };
        if secondary.handle_messages(batch).await {
            // durable before the caller hears "handled"
            secondary.flush().await;
            self.backlog += incoming;
            self.base.clear_status();
            true
        } else {
            warn!(category = %self.base.category, at_risk = batch.len(),
                "secondary store failed while primary is down");
            self.base.set_status("Failed to write to secondary store");
            false
        }
    }

    /// One periodic tick's worth of backlog replay.
    async fn drain(&mut self) {
        for _ in 0..self.buffer_send_rate.max(1) {
            let now = self.ctx.clock.wall();
            let (Some(primary), Some(secondary)) =
                (self.primary.as_mut(), self.secondary.as_mut())
            else {
                return;
            };

            if secondary.empty(now).await {
                self.backlog = 0;
                self.base.clear_status();
                self.change_state(BufferState::Streaming);
                return;
            }
            let Some(mut replay) = secondary.read_oldest().await else {
                // unreadable entry: stay in this state and retry next tick
                return;
            };
            if replay.is_empty() {
                secondary.delete_oldest().await;
                continue;
            }

            let count = replay.len() as u64;
            if primary.handle_messages(&mut replay).await {
                secondary.delete_oldest().await;
                self.backlog = self.backlog.saturating_sub(count);
            } else {
                // put the unsent remainder back ahead of everything else
                if !secondary.replace_oldest(&replay).await {
                    error!(category = %self.base.category, at_risk = replay.len(),
                        "could not return unsent messages to the buffer");
                    self.base.set_status("Failed to return messages to secondary store");
                }
                self.sample_retry();
                self.change_state(BufferState::Disconnected);
                return;
            }
        }
    }
}

#[async_trait]
impl Store for BufferedFailoverStore {
    fn base(&self) -> &StoreBase {
        &self.base
    }

    fn configure(&mut self, config: &StoreConfig) {
        self.config = config.clone();
        self.max_queue_length = config.uint("max_queue_length", DEFAULT_MAX_QUEUE_LENGTH);
        self.buffer_send_rate = config.uint("buffer_send_rate", DEFAULT_BUFFER_SEND_RATE);
        self.avg_retry_interval = config.uint("retry_interval", DEFAULT_RETRY_INTERVAL_SECS);
        self.retry_interval_range =
            config.uint("retry_interval_range", DEFAULT_RETRY_RANGE_SECS);
        self.replay_buffer = config.flag("replay_buffer", true);
        if self.retry_interval_range > self.avg_retry_interval {
            warn!(category = %self.base.category,
                interval = self.avg_retry_interval, range = self.retry_interval_range,
                "retry_interval_range larger than retry_interval, clamping");
            self.retry_interval_range = self.avg_retry_interval;
        }

        self.primary = self.build_child(config, "primary", false);
        self.secondary = self.build_child(config, "secondary", true);
    }

    async fn open(&mut self) -> bool {
        let primary_ok = match self.primary.as_mut() {
            Some(primary) => primary.open().await,
            None => false,
        };
        if primary_ok {
            let next = if self.replay_buffer {
                BufferState::SendingBuffer
            } else {
                BufferState::Streaming
            };
            self.change_state(next);
        } else {
            self.sample_retry();
            self.change_state(BufferState::Disconnected);
            if let Some(secondary) = self.secondary.as_mut() {
                secondary.open().await;
            }
        }
        self.is_open()
    }

    fn is_open(&self) -> bool {
        self.primary.as_ref().is_some_and(|p| p.is_open())
            || self.secondary.as_ref().is_some_and(|s| s.is_open())
    }

    async fn close(&mut self) {
        if let Some(primary) = self.primary.as_mut() {
            primary.close().await;
        }
        if let Some(secondary) = self.secondary.as_mut() {
            secondary.close().await;
        }
        self.change_state(BufferState::Disconnected);
    }

    async fn handle_messages(&mut self, batch: &mut Batch) -> bool {
        match self.state {
            BufferState::Streaming => {
                let Some(primary) = self.primary.as_mut() else {
                    return false;
                };
                if primary.handle_messages(batch).await {
                    return true;
                }
                warn!(category = %self.base.category, unhandled = batch.len(),
                    "primary store failed, spilling to secondary");
                self.sample_retry();
                self.change_state(BufferState::Disconnected);
                self.spill(batch).await
            }
            BufferState::Disconnected | BufferState::SendingBuffer => self.spill(batch).await,
        }
    }

    async fn periodic_check(&mut self) {
        if let Some(primary) = self.primary.as_mut() {
            primary.periodic_check().await;
        }
        if let Some(secondary) = self.secondary.as_mut() {
            secondary.periodic_check().await;
        }
        match self.state {
            BufferState::Streaming => {}
            BufferState::Disconnected => {
                if self.ctx.clock.now() >= self.retry_at {
                    let reopened = match self.primary.as_mut() {
                        Some(primary) => primary.open().await,
                        None => false,
                    };
                    if reopened {
                        let next = if self.replay_buffer {
                            BufferState::SendingBuffer
                        } else {
                            BufferState::Streaming
                        };
                        self.change_state(next);
                    } else {
                        self.sample_retry();
                    }
                }
            }
            BufferState::SendingBuffer => self.drain().await,
        }
    }

    async fn flush(&mut self) {
        if let Some(primary) = self.primary.as_mut() {
            if primary.is_open() {
                primary.flush().await;
            }
        }
        if let Some(secondary) = self.secondary.as_mut() {
            if secondary.is_open() {
                secondary.flush().await;
            }
        }
    }

    fn status(&self) -> String {
        let own = self.base.status.get();
        if !own.is_empty() {
            return own;
        }
        if let Some(primary) = &self.primary {
            let status = primary.status();
            if !status.is_empty() {
                return status;
            }
        }
        self.secondary
            .as_ref()
            .map(|secondary| secondary.status())
            .unwrap_or_default()
    }

    fn copy(&self, category: &str) -> Box<dyn Store> {
        let mut copied = BufferedFailoverStore::new(
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
#[path = "buffer_tests.rs"]
mod tests;
