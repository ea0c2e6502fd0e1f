// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tributary-core: shared building blocks for the store tree
//!
//! This crate provides:
//! - The message/batch data model and the length-prefixed record codec
//! - The nested string-keyed configuration accessor stores consume
//! - A clock abstraction (monotonic + wall time) for testable timing
//! - The synchronized status cell every store node exposes

pub mod clock;
pub mod config;
pub mod message;
pub mod status;

// Re-exports
pub use clock::{Clock, FakeClock, SystemClock};
pub use config::StoreConfig;
pub use message::{Batch, Message};
pub use status::StatusCell;
