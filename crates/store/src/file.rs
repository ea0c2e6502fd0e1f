// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File sink with rotation.
//!
//! Writes either newline-delimited lines (the normal mode) or
//! length-prefixed records when built as a readable spill target for the
//! buffering store; the record form round-trips byte-exact batches through
//! `read_oldest`. Naming, rotation policy, and the directory bookkeeping
//! they need live in [`FileOptions`], shared with the framed sink.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};
use tributary_core::message;
use tributary_core::{Batch, Clock, Message, StatusCell, StoreConfig};

use crate::context::StoreContext;
use crate::rotation::{self, LogName, RotatePeriod};
use crate::store::{fire_triggers, Store, StoreBase};

const DEFAULT_FILE_PATH: &str = "/tmp";
const DEFAULT_MAX_SIZE: u64 = 1_000_000_000;
const DEFAULT_MAX_WRITE_SIZE: u64 = 1_000_000;
const DEFAULT_ROTATE_HOUR: u32 = 1;
const DEFAULT_ROTATE_MINUTE: u32 = 15;

/// Line written to a rotated-out file naming its successor, so a tailing
/// reader can follow the chain.
pub(crate) const META_SUCCESSOR_PREFIX: &str = "tributary_meta<new_logfile>: ";

/// Parsed file-family options plus the directory scans that go with the
/// naming scheme.
pub(crate) struct FileOptions {
    base_path: PathBuf,
    sub_directory: Option<String>,
    pub base_filename: String,
    symlink_base: Option<String>,
    pub max_size: u64,
    pub max_write_size: u64,
    pub period: RotatePeriod,
    pub rotate_hour: u32,
    pub rotate_minute: u32,
    pub chunk_size: u64,
    pub write_meta: bool,
    pub write_category: bool,
    pub write_stats: bool,
    pub create_symlink: bool,
}

impl FileOptions {
    pub fn defaults(category: &str) -> Self {
        Self {
            base_path: PathBuf::from(DEFAULT_FILE_PATH),
            sub_directory: None,
            base_filename: category.to_string(),
            symlink_base: None,
            max_size: DEFAULT_MAX_SIZE,
            max_write_size: DEFAULT_MAX_WRITE_SIZE,
            period: RotatePeriod::Never,
            rotate_hour: DEFAULT_ROTATE_HOUR,
            rotate_minute: DEFAULT_ROTATE_MINUTE,
            chunk_size: 0,
            write_meta: false,
            write_category: false,
            write_stats: false,
            create_symlink: true,
        }
    }

    pub fn configure(&mut self, category: &str, config: &StoreConfig) {
        self.base_path = PathBuf::from(config.str("file_path").unwrap_or(DEFAULT_FILE_PATH));
        self.sub_directory = config.str("sub_directory").map(str::to_string);
        if config.flag("use_hostname_sub_directory", false) {
            if self.sub_directory.is_some() {
                warn!(category = %category,
                    "use_hostname_sub_directory overrides sub_directory");
            }
            match hostname() {
                Some(host) => self.sub_directory = Some(host),
                None => warn!(category = %category, "could not determine hostname"),
            }
        }

        if let Some(name) = config.str("base_filename") {
            self.base_filename = name.to_string();
        }
        self.symlink_base = config.str("base_symlink_name").map(str::to_string);

        if let Some(value) = config.str("rotate_period") {
            match RotatePeriod::parse(value) {
                Some(period) => self.period = period,
                None => warn!(category = %category, value = %value,
                    "invalid rotate_period, rotation disabled"),
            }
        }
        if let Some(fs_type) = config.str("fs_type") {
            if fs_type != "std" {
                warn!(category = %category, fs_type = %fs_type,
                    "unsupported fs_type, using the standard filesystem");
            }
        }

        self.max_size = config.uint("max_size", DEFAULT_MAX_SIZE);
        self.max_write_size = config.uint("max_write_size", DEFAULT_MAX_WRITE_SIZE);
        self.rotate_hour = config.uint("rotate_hour", u64::from(DEFAULT_ROTATE_HOUR)) as u32;
        self.rotate_minute = config.uint("rotate_minute", u64::from(DEFAULT_ROTATE_MINUTE)) as u32;
        self.chunk_size = config.uint("chunk_size", 0);
        self.write_meta = config.flag("write_meta", false);
        self.write_category = config.flag("write_category", false);
        self.write_stats = config.flag("write_stats", false);
        self.create_symlink = config.flag("create_symlink", true);
    }

    /// Rebases a copied store under its new category so per-category and
    /// per-bucket children never collide on disk.
    pub fn rebase_for_copy(&mut self, category: &str) {
        self.base_path.push(category);
        self.base_filename = category.to_string();
    }

    pub fn dir(&self) -> PathBuf {
        match &self.sub_directory {
            Some(sub) => self.base_path.join(sub),
            None => self.base_path.clone(),
        }
    }

    pub fn date_for(&self, now: DateTime<Utc>) -> Option<NaiveDate> {
        self.period.dates_filenames().then(|| now.date_naive())
    }

    pub fn file_path(&self, name: &LogName) -> PathBuf {
        self.dir()
            .join(rotation::format_name(&self.base_filename, name.date, name.suffix))
    }

    /// Every log file for this base, oldest first.
    pub fn scan(&self) -> Vec<LogName> {
        let mut names = Vec::new();
        let Ok(entries) = fs::read_dir(self.dir()) else {
            return names;
        };
        for entry in entries.flatten() {
            if let Some(name) = entry.file_name().to_str() {
                if let Some(parsed) = rotation::parse_name(name, &self.base_filename) {
                    names.push(parsed);
                }
            }
        }
        names.sort_unstable();
        names
    }

    /// Highest suffix already on disk for one naming period.
    pub fn newest_suffix(&self, date: Option<NaiveDate>) -> Option<u32> {
        self.scan()
            .into_iter()
            .filter(|name| name.date == date)
            .map(|name| name.suffix)
            .max()
    }

    /// Oldest file across every period; replay must not strand files from
    /// a previous date.
    pub fn oldest(&self) -> Option<LogName> {
        self.scan().into_iter().next()
    }

    fn symlink_name(&self) -> String {
        let base = self.symlink_base.as_deref().unwrap_or(&self.base_filename);
        format!("{base}_current")
    }

    /// Best-effort `<base>_current` symlink to the active file.
    pub fn point_symlink(&self, target: &str) {
        let link = self.dir().join(self.symlink_name());
        #[cfg(unix)]
        {
            let _ = fs::remove_file(&link);
            if let Err(error) = std::os::unix::fs::symlink(target, &link) {
                debug!(link = %link.display(), error = %error,
                    "could not update current symlink");
            }
        }
        #[cfg(not(unix))]
        let _ = link;
    }

    /// Creates the directory and opens (or appends to) the named log file,
    /// recording failure in `status`.
    pub fn open_log(
        &self,
        name: LogName,
        now: DateTime<Utc>,
        category: &str,
        status: &StatusCell,
    ) -> Option<OpenFile> {
        let dir = self.dir();
        if let Err(error) = fs::create_dir_all(&dir) {
            warn!(category = %category, dir = %dir.display(), error = %error,
                "could not create path for file");
            status.set("File open error");
            return None;
        }

        let path = self.file_path(&name);
        match OpenOptions::new().create(true).append(true).open(&path) {
            Ok(file) => {
                let size = file.metadata().map(|m| m.len()).unwrap_or(0);
                info!(category = %category, file = %path.display(), size,
                    "opened file for writing");
                if self.create_symlink {
                    let target = rotation::format_name(&self.base_filename, name.date, name.suffix);
                    self.point_symlink(&target);
                }
                status.clear();
                Some(OpenFile {
                    file,
                    name,
                    path,
                    size,
                    events: 0,
                    opened_at: now,
                })
            }
            Err(error) => {
                warn!(category = %category, file = %path.display(), error = %error,
                    "failed to open file for writing");
                status.set("File open error");
                None
            }
        }
    }

    /// Flushes a finished write file and records its stats line.
    pub fn finish_log(&self, mut open: OpenFile, now: DateTime<Utc>) {
        if let Err(error) = open.file.flush() {
            debug!(file = %open.path.display(), error = %error, "flush on close failed");
        }
        if self.write_stats {
            let filename = rotation::format_name(&self.base_filename, open.name.date, open.name.suffix);
            self.append_stats(now, open.size, open.events, &filename);
        }
    }

    /// Appends one rotation summary to the sibling stats file.
    pub fn append_stats(&self, now: DateTime<Utc>, bytes: u64, events: u64, filename: &str) {
        let path = self.dir().join(format!("{}_stats", self.base_filename));
        let line = format!(
            "{} wrote <{bytes}> bytes in <{events}> events to file <{filename}>\n",
            now.format("%Y-%m-%d-%H:%M")
        );
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut file| file.write_all(line.as_bytes()));
        if let Err(error) = result {
            // not worth degrading the store's status over
            warn!(file = %path.display(), error = %error, "failed to append stats");
        }
    }
}

fn hostname() -> Option<String> {
    let output = std::process::Command::new("hostname").output().ok()?;
    if !output.status.success() {
        return None;
    }
    let name = String::from_utf8_lossy(&output.stdout).trim().to_string();
    (!name.is_empty()).then_some(name)
}

/// The active write file of a file-family sink.
pub(crate) struct OpenFile {
    pub file: File,
    pub name: LogName,
    pub path: PathBuf,
    pub size: u64,
    pub events: u64,
    pub opened_at: DateTime<Utc>,
}

pub struct FileSinkStore {
    base: StoreBase,
    ctx: StoreContext,
    config: StoreConfig,
    // record framing + read-side ops, for use as a buffer spill target
    readable: bool,
    opts: FileOptions,
    open_file: Option<OpenFile>,
    read_target: Option<PathBuf>,
}

impl FileSinkStore {
    pub fn new(
        ctx: StoreContext,
        category: &str,
        multi_category: bool,
        trigger_path: Option<String>,
        readable: bool,
    ) -> Self {
        Self {
            base: StoreBase::new("file", category, multi_category, trigger_path),
            ctx,
            config: StoreConfig::new(),
            readable,
            opts: FileOptions::defaults(category),
            open_file: None,
            read_target: None,
        }
    }

    fn encode_message(&self, message: &Message, out: &mut Vec<u8>) {
        if self.readable {
            message.encode_record(out);
        } else {
            if self.opts.write_category {
                out.extend_from_slice(message.category.as_bytes());
                out.extend_from_slice(b" : ");
            }
            out.extend_from_slice(&message.payload);
            out.push(b'\n');
        }
    }

    fn open_at(&mut self, name: LogName, now: DateTime<Utc>) -> bool {
        match self
            .opts
            .open_log(name, now, &self.base.category, &self.base.status)
        {
            Some(open) => {
                self.open_file = Some(open);
                true
            }
            None => false,
        }
    }

    fn open_current(&mut self, increment: bool) -> bool {
        let now = self.ctx.clock.wall();
        let date = self.opts.date_for(now);
        let suffix = match self.opts.newest_suffix(date) {
            Some(existing) if increment => existing + 1,
            Some(existing) => existing,
            None => 0,
        };
        self.open_at(LogName { date, suffix }, now)
    }

    fn write_group(&mut self, bytes: &[u8], count: u64) -> bool {
        let Some(open) = self.open_file.as_mut() else {
            return false;
        };
        match open.file.write_all(bytes) {
            Ok(()) => {
                open.size += bytes.len() as u64;
                open.events += count;
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

    fn close_current(&mut self, now: DateTime<Utc>) {
        if let Some(open) = self.open_file.take() {
            self.opts.finish_log(open, now);
        }
    }

    fn next_name(&self, now: DateTime<Utc>) -> LogName {
        let date = self.opts.date_for(now);
        let suffix = match self.opts.newest_suffix(date) {
            Some(existing) => existing + 1,
            None => 0,
        };
        LogName { date, suffix }
    }

    fn rotate(&mut self, now: DateTime<Utc>) {
        if self.open_file.is_none() {
            return;
        }
        let next = self.next_name(now);
        if let Some(open) = self.open_file.as_mut() {
            info!(category = %self.base.category, file = %open.path.display(),
                size = open.size, max_size = self.opts.max_size, "rotating file");
            // record framing must stay well-formed, so the meta line is
            // plain-mode only
            if self.opts.write_meta && !self.readable {
                let line = format!(
                    "{}{}\n",
                    META_SUCCESSOR_PREFIX,
                    rotation::format_name(&self.opts.base_filename, next.date, next.suffix)
                );
                if let Err(error) = open.file.write_all(line.as_bytes()) {
                    warn!(category = %self.base.category, error = %error,
                        "failed to write meta line");
                }
            }
        }
        self.close_current(now);
        self.open_at(next, now);
    }
}

#[async_trait]
impl Store for FileSinkStore {
    fn base(&self) -> &StoreBase {
        &self.base
    }

    fn configure(&mut self, config: &StoreConfig) {
        self.config = config.clone();
        self.opts.configure(&self.base.category, config);
    }

    async fn open(&mut self) -> bool {
        if self.open_file.is_some() {
            return true;
        }
        // continue appending to the newest file from this period
        self.open_current(false)
    }

    fn is_open(&self) -> bool {
        self.open_file.is_some()
    }

    async fn close(&mut self) {
        let now = self.ctx.clock.wall();
        self.close_current(now);
    }

    async fn handle_messages(&mut self, batch: &mut Batch) -> bool {
        if batch.is_empty() {
            return true;
        }
        if self.open_file.is_none() && !self.open_current(false) {
            warn!(category = %self.base.category, "could not open file for batch");
            return false;
        }

        // padding would corrupt the record stream, so chunk alignment is
        // line-mode only
        let chunk_size = if self.readable {
            0
        } else {
            self.opts.chunk_size as usize
        };
        let max_write = self.opts.max_write_size as usize;

        let mut handled = 0usize;
        let mut group: Vec<u8> = Vec::new();
        let mut group_count = 0u64;
        let mut failed = false;

        for message in batch.iter() {
            let mut record = Vec::with_capacity(message.record_len());
            self.encode_message(message, &mut record);

            let written = self.open_file.as_ref().map_or(0, |open| open.size) as usize;
            let pad = rotation::bytes_to_pad(record.len(), written + group.len(), chunk_size);
            group.resize(group.len() + pad, 0);
            group.extend_from_slice(&record);
            group_count += 1;

            if group.len() > max_write {
                if !self.write_group(&group, group_count) {
                    failed = true;
                    break;
                }
                handled += group_count as usize;
                group.clear();
                group_count = 0;
            }
        }

        if !failed && !group.is_empty() {
            if self.write_group(&group, group_count) {
                handled += group_count as usize;
            } else {
                failed = true;
            }
        }

        fire_triggers(&self.base, &self.ctx, &batch[..handled]);
        if failed {
            batch.drain(..handled);
            return false;
        }
        batch.clear();
        true
    }

    async fn periodic_check(&mut self) {
        let now = self.ctx.clock.wall();
        let Some(open) = &self.open_file else {
            return;
        };
        let over_size = self.opts.max_size != 0 && open.size > self.opts.max_size;
        let time_due =
            self.opts
                .period
                .due(open.opened_at, now, self.opts.rotate_hour, self.opts.rotate_minute);
        if over_size || time_due {
            self.rotate(now);
        }
    }

    async fn flush(&mut self) {
        if let Some(open) = self.open_file.as_mut() {
            if let Err(error) = open.file.sync_all() {
                warn!(category = %self.base.category, file = %open.path.display(),
                    error = %error, "file sync failed");
            }
        }
    }

    async fn read_oldest(&mut self) -> Option<Batch> {
        if !self.readable {
            warn!(category = %self.base.category, kind = %self.base.kind,
                "attempting to read from a write-only store");
            return None;
        }
        let now = self.ctx.clock.wall();
        let oldest = self.opts.oldest()?;
        let path = self.opts.file_path(&oldest);

        // reading the active write file: close it so its tail is on disk
        // and new writes move to a fresh suffix
        if self.open_file.as_ref().is_some_and(|open| open.path == path) {
            self.close_current(now);
        }

        match fs::read(&path) {
            Ok(bytes) => {
                let (batch, consumed) = message::decode_batch(&bytes);
                if consumed < bytes.len() {
                    warn!(category = %self.base.category, file = %path.display(),
                        lost = bytes.len() - consumed, "corrupt tail in spill file");
                }
                debug!(category = %self.base.category, file = %path.display(),
                    count = batch.len(), "read oldest spill file");
                self.read_target = Some(path);
                Some(batch)
            }
            Err(error) => {
                warn!(category = %self.base.category, file = %path.display(),
                    error = %error, "failed to read spill file");
                self.base.set_status("File read error");
                None
            }
        }
    }

    async fn replace_oldest(&mut self, batch: &[Message]) -> bool {
        if !self.readable {
            warn!(category = %self.base.category, kind = %self.base.kind,
                "attempting to write back to a write-only store");
            return false;
        }
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
                    error = %error, "failed to write back spill file");
                self.base.set_status("File write error");
                false
            }
        }
    }

    async fn delete_oldest(&mut self) -> bool {
        if !self.readable {
            warn!(category = %self.base.category, kind = %self.base.kind,
                "attempting to delete from a write-only store");
            return false;
        }
        let Some(path) = self.read_target.take() else {
            warn!(category = %self.base.category, "delete_oldest without a prior read");
            return false;
        };
        match fs::remove_file(&path) {
            Ok(()) => true,
            Err(error) => {
                warn!(category = %self.base.category, file = %path.display(),
                    error = %error, "failed to delete spill file");
                self.base.set_status("File delete error");
                false
            }
        }
    }

    async fn empty(&mut self, _now: DateTime<Utc>) -> bool {
        if !self.readable {
            warn!(category = %self.base.category, kind = %self.base.kind,
                "attempting to read from a write-only store");
            return true;
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
        let mut copied = FileSinkStore::new(
            self.ctx.clone(),
            category,
            self.base.multi_category,
            self.base.trigger_path.clone(),
            self.readable,
        );
        copied.configure(&self.config);
        copied.opts.rebase_for_copy(category);
        Box::new(copied)
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
