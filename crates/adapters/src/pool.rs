// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared connection pool for batch forwarding.
//!
//! Entries are reference-counted per endpoint: stores addressing the same
//! downstream daemon share one live connection instead of each dialing their
//! own. The pool is an injected component, cloned into every store that
//! needs it; a clone shares the same slots.
//!
//! Locking: the slot map uses a std mutex held only for map bookkeeping;
//! each connection sits behind its own async mutex so one endpoint's I/O
//! never blocks another's.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;
use tracing::debug;
use tributary_core::Message;

use crate::forward::{Connection, Endpoint, NetError, Transport};

type SharedConn = Arc<AsyncMutex<Option<Box<dyn Connection>>>>;

struct Slot {
    refs: usize,
    conn: SharedConn,
}

#[derive(Clone, Default)]
pub struct ConnPool {
    slots: Arc<Mutex<HashMap<Endpoint, Slot>>>,
}

/// A reference-counted claim on one endpoint's shared connection.
///
/// Obtained from [`ConnPool::acquire`] and given back with
/// [`ConnPool::release`]; dropping a handle without releasing it leaks the
/// reference count, so stores guard their release with an `opened` flag.
pub struct PoolHandle {
    endpoint: Endpoint,
    conn: SharedConn,
}

impl ConnPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the slot for `endpoint`, creating it if needed.
    pub fn acquire(&self, endpoint: &Endpoint) -> PoolHandle {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let slot = slots.entry(endpoint.clone()).or_insert_with(|| Slot {
            refs: 0,
            conn: Arc::new(AsyncMutex::new(None)),
        });
        slot.refs += 1;
        debug!(endpoint = %endpoint, refs = slot.refs, "pool slot acquired");
        PoolHandle {
            endpoint: endpoint.clone(),
            conn: Arc::clone(&slot.conn),
        }
    }

    /// Returns a claim. The last holder out tears the connection down.
    pub async fn release(&self, handle: PoolHandle) {
        let last = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            match slots.get_mut(&handle.endpoint) {
                Some(slot) => {
                    slot.refs = slot.refs.saturating_sub(1);
                    if slot.refs == 0 {
                        slots.remove(&handle.endpoint);
                        true
                    } else {
                        false
                    }
                }
                None => true,
            }
        };
        if last {
            debug!(endpoint = %handle.endpoint, "pool slot closed");
            if let Some(mut conn) = handle.conn.lock().await.take() {
                conn.shutdown().await;
            }
        }
    }

    /// Current number of claims on `endpoint`. Zero once the slot is gone.
    pub fn holders(&self, endpoint: &Endpoint) -> usize {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.get(endpoint).map_or(0, |slot| slot.refs)
    }
}

impl PoolHandle {
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Connects the shared slot if no holder has yet.
    pub async fn ensure_open(
        &self,
        transport: &dyn Transport,
        timeout: Duration,
    ) -> Result<(), NetError> {
        let mut conn = self.conn.lock().await;
        if conn.is_none() {
            *conn = Some(transport.connect(&self.endpoint, timeout).await?);
        }
        Ok(())
    }

    /// Sends over the shared connection. A send error discards the
    /// connection so the next `ensure_open` redials.
    pub async fn send(&self, batch: &[Message]) -> Result<(), NetError> {
        let mut conn = self.conn.lock().await;
        match conn.as_mut() {
            None => Err(NetError::NotConnected),
            Some(live) => match live.send_batch(batch).await {
                Ok(()) => Ok(()),
                Err(e) => {
                    *conn = None;
                    Err(e)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::forward::FakeTransport;

    #[tokio::test]
    async fn holders_share_one_connection() {
        let transport = FakeTransport::new();
        let pool = ConnPool::new();
        let endpoint = Endpoint::new("collector", 1463);

        let a = pool.acquire(&endpoint);
        let b = pool.acquire(&endpoint);
        assert_eq!(pool.holders(&endpoint), 2);

        a.ensure_open(&transport, Duration::from_secs(1))
            .await
            .unwrap();
        b.ensure_open(&transport, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(transport.connect_attempts(), 1);

        b.send(&[Message::new("web", &b"x"[..])]).await.unwrap();
        assert_eq!(transport.sent().len(), 1);

        pool.release(a).await;
        assert_eq!(pool.holders(&endpoint), 1);
        pool.release(b).await;
        assert_eq!(pool.holders(&endpoint), 0);
    }

    #[tokio::test]
    async fn send_failure_discards_the_connection() {
        let transport = FakeTransport::new();
        let pool = ConnPool::new();
        let endpoint = Endpoint::new("collector", 1463);

        let handle = pool.acquire(&endpoint);
        handle
            .ensure_open(&transport, Duration::from_secs(1))
            .await
            .unwrap();

        transport.fail_sends(true);
        assert!(handle.send(&[]).await.is_err());
        // connection was dropped: sending again without reopening fails fast
        assert!(matches!(
            handle.send(&[]).await,
            Err(NetError::NotConnected)
        ));

        transport.fail_sends(false);
        handle
            .ensure_open(&transport, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(transport.connect_attempts(), 2);
        handle.send(&[]).await.unwrap();

        pool.release(handle).await;
    }

    #[tokio::test]
    async fn distinct_endpoints_get_distinct_slots() {
        let pool = ConnPool::new();
        let a = Endpoint::new("east", 1463);
        let b = Endpoint::new("west", 1463);

        let ha = pool.acquire(&a);
        let hb = pool.acquire(&b);
        assert_eq!(pool.holders(&a), 1);
        assert_eq!(pool.holders(&b), 1);

        pool.release(ha).await;
        assert_eq!(pool.holders(&a), 0);
        assert_eq!(pool.holders(&b), 1);
        pool.release(hb).await;
    }
}
