// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Framed file sink with write-side buffering.
//!
//! Always writes length-prefixed records, so any of its files can be
//! decoded back into batches. Records accumulate in memory and reach the
//! file when `msg_buffer_size` bytes build up, when `flush_frequency_ms`
//! elapses, or on an explicit flush. Unlike the plain sink it starts a
//! fresh suffix on every open and rotates on size as part of the write
//! path, not just on the periodic tick.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use tributary_core::message;
use tributary_core::{Batch, Clock, Message, StoreConfig};

use crate::context::StoreContext;
use crate::file::{FileOptions, OpenFile};
use crate::rotation::LogName;
use crate::store::{fire_triggers, Store, StoreBase};

pub struct FramedFileStore {
    base: StoreBase,
    ctx: StoreContext,
    config: StoreConfig,
    opts: FileOptions,
    // 0 disables the byte threshold / the timed flush respectively
    msg_buffer_size: usize,
    flush_frequency: Duration,
    open_file: Option<OpenFile>,
    pending: Vec<u8>,
    pending_events: u64,
    last_flush: Instant,
    read_target: Option<PathBuf>,
}

impl FramedFileStore {
    pub fn new(
        ctx: StoreContext,
        category: &str,
        multi_category: bool,
        trigger_path: Option<String>,
    ) -> Self {
        let last_flush = ctx.clock.now();
        Self {
            base: StoreBase::new("thriftfile", category, multi_category, trigger_path),
            ctx,
            config: StoreConfig::new(),
            opts: FileOptions::defaults(category),
            msg_buffer_size: 0,
            flush_frequency: Duration::ZERO,
            open_file: None,
            pending: Vec::new(),
            pending_events: 0,
            last_flush,
            read_target: None,
        }
    }

    fn open_fresh(&mut self) -> bool {
        let now = self.ctx.clock.wall();
        let date = self.opts.date_for(now);
        // always a fresh suffix; appending records to a reopened file is
        // the plain sink's business, this one owns its files end to end
        let suffix = match self.opts.newest_suffix(date) {
            Some(existing) => existing + 1,
            None => 0,
        };
        match self.opts.open_log(
            LogName { date, suffix },
            now,
            &self.base.category,
            &self.base.status,
        ) {
            Some(open) => {
                self.open_file = Some(open);
                true
            }
            None => false,
        }
    }

    fn write_pending(&mut self) -> bool {
        if self.pending.is_empty() {
            return true;
        }
        if self.open_file.is_none() && !self.open_fresh() {
            return false;
        }
        let Some(open) = self.open_file.as_mut() else {
            return false;
        };
        match std::io::Write::write_all(&mut open.file, &self.pending) {
            Ok(()) => {
                open.size += self.pending.len() as u64;
                open.events += self.pending_events;
                self.pending.clear();
                self.pending_events = 0;
                self.last_flush = self.ctx.clock.now();
                true
            }
            Err(error) => {
                warn!(category = %self.base.category, file = %open.path.display(),
                    error = %error, "file write failed");
                self.base.set_status("File write error");
                false
            }
        }
    }

    fn over_size(&self) -> bool {
        self.opts.max_size != 0
            && self
                .open_file
                .as_ref()
                .is_some_and(|open| open.size > self.opts.max_size)
    }

    fn rotate(&mut self, now: DateTime<Utc>) {
        // pending records carry over and land at the head of the successor
        self.write_pending();
        if let Some(open) = self.open_file.take() {
            debug!(category = %self.base.category, file = %open.path.display(),
                size = open.size, "rotating framed file");
            self.opts.finish_log(open, now);
        }
        self.open_fresh();
    }
}

#[async_trait]
impl Store for FramedFileStore {
    fn base(&self) -> &StoreBase {
        &self.base
    }

    fn configure(&mut self, config: &StoreConfig) {
        self.config = config.clone();
        self.opts.configure(&self.base.category, config);
        self.msg_buffer_size = config.uint("msg_buffer_size", 0) as usize;
        self.flush_frequency = Duration::from_millis(config.uint("flush_frequency_ms", 0));
    }

    async fn open(&mut self) -> bool {
        if self.open_file.is_some() {
            return true;
        }
        self.open_fresh()
    }

    fn is_open(&self) -> bool {
        self.open_file.is_some()
    }

    async fn close(&mut self) {
        self.write_pending();
        let now = self.ctx.clock.wall();
        if let Some(open) = self.open_file.take() {
            self.opts.finish_log(open, now);
        }
    }

    async fn handle_messages(&mut self, batch: &mut Batch) -> bool {
        if batch.is_empty() {
            return true;
        }
        if self.open_file.is_none() && !self.open_fresh() {
            warn!(category = %self.base.category, "could not open framed file for batch");
            return false;
        }

        let mut appended = 0usize;
        let mut failed = false;
        for message in batch.iter() {
            message.encode_record(&mut self.pending);
            self.pending_events += 1;
            appended += 1;
            if self.msg_buffer_size != 0 && self.pending.len() >= self.msg_buffer_size {
                if !self.write_pending() {
                    failed = true;
                    break;
                }
                if self.over_size() {
                    let now = self.ctx.clock.wall();
                    self.rotate(now);
                }
            }
        }

        // write-through unless a timed flush cadence is configured
        if !failed && self.flush_frequency.is_zero() {
            failed = !self.write_pending();
            if !failed && self.over_size() {
                let now = self.ctx.clock.wall();
                self.rotate(now);
            }
        }

        fire_triggers(&self.base, &self.ctx, &batch[..appended]);
        if failed {
            // accepted records stay queued in `pending`; only the rest of
            // the batch is the caller's to retry
            batch.drain(..appended);
            return false;
        }
        batch.clear();
        true
    }

    async fn periodic_check(&mut self) {
        if !self.flush_frequency.is_zero()
            && self.ctx.clock.now().duration_since(self.last_flush) >= self.flush_frequency
        {
            self.write_pending();
        }
        let now = self.ctx.clock.wall();
        let time_due = self.open_file.as_ref().is_some_and(|open| {
            self.opts
                .period
                .due(open.opened_at, now, self.opts.rotate_hour, self.opts.rotate_minute)
        });
        if self.over_size() || time_due {
            self.rotate(now);
        }
    }

    async fn flush(&mut self) {
        if !self.write_pending() {
            return;
        }
        if let Some(open) = self.open_file.as_mut() {
            if let Err(error) = open.file.sync_all() {
                warn!(category = %self.base.category, file = %open.path.display(),
                    error = %error, "file sync failed");
            }
        }
    }

    async fn read_oldest(&mut self) -> Option<Batch> {
        let now = self.ctx.clock.wall();
        if !self.pending.is_empty() && !self.write_pending() {
            return None;
        }
        let oldest = self.opts.oldest()?;
        let path = self.opts.file_path(&oldest);

        if self.open_file.as_ref().is_some_and(|open| open.path == path) {
            if let Some(open) = self.open_file.take() {
                self.opts.finish_log(open, now);
            }
        }

        match fs::read(&path) {
            Ok(bytes) => {
                let (batch, consumed) = message::decode_batch(&bytes);
                if consumed < bytes.len() {
                    warn!(category = %self.base.category, file = %path.display(),
                        lost = bytes.len() - consumed, "corrupt tail in framed file");
                }
                debug!(category = %self.base.category, file = %path.display(),
                    count = batch.len(), "read oldest framed file");
                self.read_target = Some(path);
                Some(batch)
            }
            Err(error) => {
                warn!(category = %self.base.category, file = %path.display(),
                    error = %error, "failed to read framed file");
                self.base.set_status("File read error");
                None
            }
        }
    }

    async fn replace_oldest(&mut self, batch: &[Message]) -> bool {
        let Some(path) = self.read_target.take() else {
            warn!(category = %self.base.category, "replace_oldest without a prior read");
            return false;
        };
        let mut buf = Vec::new();
        message::encode_batch(batch, &mut buf);
        match fs::write(&path, &buf) {
            Ok(()) => true,
            Err(error) => {
                warn!(category = %self.base.category, file = %path.display(),
                    error = %error, "failed to write back framed file");
                self.base.set_status("File write error");
                false
            }
        }
    }

    async fn delete_oldest(&mut self) -> bool {
        let Some(path) = self.read_target.take() else {
            warn!(category = %self.base.category, "delete_oldest without a prior read");
            return false;
        };
        match fs::remove_file(&path) {
            Ok(()) => true,
            Err(error) => {
                warn!(category = %self.base.category, file = %path.display(),
                    error = %error, "failed to delete framed file");
                self.base.set_status("File delete error");
                false
            }
        }
    }

    async fn empty(&mut self, _now: DateTime<Utc>) -> bool {
        if !self.pending.is_empty() {
            return false;
        }
        for name in self.opts.scan() {
            let path = self.opts.file_path(&name);
            if fs::metadata(&path).map(|meta| meta.len() > 0).unwrap_or(false) {
                return false;
            }
        }
        true
    }

    fn copy(&self, category: &str) -> Box<dyn Store> {
        let mut copied = FramedFileStore::new(
            self.ctx.clone(),
            category,
            self.base.multi_category,
            self.base.trigger_path.clone(),
        );
        copied.configure(&self.config);
        copied.opts.rebase_for_copy(category);
        Box::new(copied)
    }
}

#[cfg(test)]
#[path = "framed_tests.rs"]
mod tests;
