// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File rotation policy and log file naming.
//!
//! Pure calendar and naming logic shared by the file-backed stores; all
//! filesystem work stays with the stores themselves.

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};

/// When an open log file should be cut over to a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotatePeriod {
    Never,
    Hourly,
    Daily,
    Seconds(u64),
}

impl RotatePeriod {
    /// Parses `hourly`, `daily`, `never`, or a count with an optional
    /// `s`/`m`/`h`/`d`/`w` unit (bare counts are seconds). A zero interval
    /// means never.
    pub fn parse(value: &str) -> Option<RotatePeriod> {
        match value {
            "never" => Some(RotatePeriod::Never),
            "hourly" => Some(RotatePeriod::Hourly),
            "daily" => Some(RotatePeriod::Daily),
            other => {
                let (digits, unit) = match other.find(|c: char| !c.is_ascii_digit()) {
                    Some(pos) => other.split_at(pos),
                    None => (other, ""),
                };
                let count: u64 = digits.parse().ok()?;
                let unit_seconds: u64 = match unit {
                    "" | "s" => 1,
                    "m" => 60,
                    "h" => 3600,
                    "d" => 86400,
                    "w" => 604800,
                    _ => return None,
                };
                match count.checked_mul(unit_seconds) {
                    None | Some(0) => Some(RotatePeriod::Never),
                    Some(seconds) => Some(RotatePeriod::Seconds(seconds)),
                }
            }
        }
    }

    /// Whether a file opened at `opened_at` is due for rotation at `now`.
    ///
    /// Daily rotation compares `(hour, minute)` as a pair against the
    /// configured target, so any time at or past the target on a later
    /// date qualifies.
    pub fn due(
        &self,
        opened_at: DateTime<Utc>,
        now: DateTime<Utc>,
        rotate_hour: u32,
        rotate_minute: u32,
    ) -> bool {
        match self {
            RotatePeriod::Never => false,
            RotatePeriod::Hourly => {
                now.date_naive() != opened_at.date_naive() || now.hour() != opened_at.hour()
            }
            RotatePeriod::Daily => {
                now.date_naive() != opened_at.date_naive()
                    && (now.hour(), now.minute()) >= (rotate_hour, rotate_minute)
            }
            RotatePeriod::Seconds(seconds) => {
                now.signed_duration_since(opened_at).num_seconds() >= *seconds as i64
            }
        }
    }

    /// Rotating stores put the creation date in the file name so old files
    /// stay distinguishable; a store that never rotates does not.
    pub fn dates_filenames(&self) -> bool {
        !matches!(self, RotatePeriod::Never)
    }
}

/// Parsed form of one log file name, ordered oldest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LogName {
    pub date: Option<NaiveDate>,
    pub suffix: u32,
}

/// Builds `<base>[-YYYY-MM-DD]_<NNNNN>`.
pub fn format_name(base: &str, date: Option<NaiveDate>, suffix: u32) -> String {
    match date {
        Some(date) => format!("{base}-{}_{suffix:05}", date.format("%Y-%m-%d")),
        None => format!("{base}_{suffix:05}"),
    }
}

/// Parses a name produced by [`format_name`] for this `base`; anything
/// else in the directory returns `None`.
pub fn parse_name(name: &str, base: &str) -> Option<LogName> {
    let rest = name.strip_prefix(base)?;
    let (date, digits) = if let Some(after) = rest.strip_prefix('_') {
        (None, after)
    } else {
        let dated = rest.strip_prefix('-')?;
        let (date, after) = dated.split_once('_')?;
        let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
        (Some(date), after)
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(LogName {
        date,
        suffix: digits.parse().ok()?,
    })
}

/// Zero padding needed before the next record so it does not straddle a
/// chunk boundary. Zero `chunk_size` disables chunking.
pub fn bytes_to_pad(next_record_len: usize, current_size: usize, chunk_size: usize) -> usize {
    if chunk_size == 0 {
        return 0;
    }
    let space_left = chunk_size - current_size % chunk_size;
    if next_record_len > space_left {
        space_left
    } else {
        0
    }
}

#[cfg(test)]
#[path = "rotation_tests.rs"]
mod tests;
