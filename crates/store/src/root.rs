// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cloneable handle over the root of a store tree.
//!
//! Front-end tasks clone the handle to submit batches while a timer task
//! drives `periodic_check`. One async mutex serializes access to the tree;
//! nodes below the root assume a single caller context at a time.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tributary_core::Batch;

use crate::store::Store;

#[derive(Clone)]
pub struct TreeHandle {
    root: Arc<Mutex<Box<dyn Store>>>,
}

impl TreeHandle {
    pub fn new(root: Box<dyn Store>) -> Self {
        Self {
            root: Arc::new(Mutex::new(root)),
        }
    }

    /// Hands a batch to the tree, opening the root first when needed.
    ///
    /// On `false` the batch holds exactly the unhandled messages, in their
    /// original order, ready for the caller to retry.
    pub async fn submit(&self, batch: &mut Batch) -> bool {
        let mut root = self.root.lock().await;
        if !root.is_open() && !root.open().await {
            return false;
        }
        root.handle_messages(batch).await
    }

    /// One bookkeeping tick: rotation, retries, timed flushes.
    pub async fn periodic_check(&self) {
        self.root.lock().await.periodic_check().await;
    }

    pub async fn flush(&self) {
        self.root.lock().await.flush().await;
    }

    pub async fn close(&self) {
        self.root.lock().await.close().await;
    }

    /// Most recent failure description, empty when healthy.
    pub async fn status(&self) -> String {
        self.root.lock().await.status()
    }

    /// Spawns the timer task that ticks the tree at a fixed cadence.
    /// Abort the returned handle to stop it.
    pub fn spawn_periodic(&self, period: Duration) -> JoinHandle<()> {
        let handle = self.clone();
        tokio::spawn(async move {
            let mut timer = interval(period);
            // skip the immediate first tick
            timer.tick().await;
            loop {
                timer.tick().await;
                handle.periodic_check().await;
            }
        })
    }
}
