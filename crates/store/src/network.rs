// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Forwarding to a downstream aggregation daemon.
//!
//! The connection is either a claim on the injected shared pool (stores
//! addressing the same endpoint share one link) or a private one. The
//! endpoint comes from a fixed host:port or from a service lookup whose
//! result is cached for a TTL; a stale list outlives lookup failures so a
//! flaky resolver does not take down a working path.
//!
//! Delivery is all-or-nothing per batch. A send failure closes the store:
//! the owning combinator decides when to retry, and its reopen redials.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{info, warn};
use tributary_adapters::{Connection, Endpoint, NetError, PoolHandle, Resolver, Transport};
use tributary_core::{Batch, Clock, StoreConfig};

use crate::context::StoreContext;
use crate::store::{Store, StoreBase};

const DEFAULT_TIMEOUT_MS: u64 = 5000;
const DEFAULT_SERVICE_CACHE_TIMEOUT_SECS: u64 = 300;

enum Conn {
    None,
    Pooled(PoolHandle),
    Private(Box<dyn tributary_adapters::Connection>),
}

struct CachedEndpoints {
    endpoints: Vec<Endpoint>,
    fetched_at: Instant,
}

pub struct NetworkForwardStore {
    base: StoreBase,
    ctx: StoreContext,
    config: StoreConfig,

    remote_host: String,
    remote_port: u16,
    service: Option<String>,
    service_options: String,
    service_cache_timeout: Duration,
    timeout: Duration,
    use_pool: bool,

    cache: Option<CachedEndpoints>,
    conn: Conn,
    // guards against double pool release; close() is idempotent
    opened: bool,
}

impl NetworkForwardStore {
    pub fn new(
        ctx: StoreContext,
        category: &str,
        multi_category: bool,
        trigger_path: Option<String>,
    ) -> Self {
        Self {
            base: StoreBase::new("network", category, multi_category, trigger_path),
            ctx,
            config: StoreConfig::new(),
            remote_host: String::new(),
            remote_port: 0,
            service: None,
            service_options: String::new(),
            service_cache_timeout: Duration::from_secs(DEFAULT_SERVICE_CACHE_TIMEOUT_SECS),
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            use_pool: true,
            cache: None,
            conn: Conn::None,
            opened: false,
        }
    }

    /// Endpoints to try, in preference order.
    async fn candidate_endpoints(&mut self) -> Vec<Endpoint> {
        let Some(service) = self.service.clone() else {
            if self.remote_host.is_empty() || self.remote_port == 0 {
                warn!(category = %self.base.category, host = %self.remote_host,
                    port = self.remote_port, "bad config, invalid remote server location");
                self.base
                    .set_status("Bad config - invalid location for remote server");
                return Vec::new();
            }
            return vec![Endpoint::new(self.remote_host.clone(), self.remote_port)];
        };

        let now = self.ctx.clock.now();
        let fresh = self
            .cache
            .as_ref()
            .is_some_and(|c| now.duration_since(c.fetched_at) < self.service_cache_timeout);

        if !fresh {
            match self
                .ctx
                .resolver
                .resolve(&service, &self.service_options)
                .await
            {
                Ok(endpoints) => {
                    self.cache = Some(CachedEndpoints {
                        endpoints,
                        fetched_at: now,
                    });
                }
                Err(error) => {
                    warn!(category = %self.base.category, service = %service,
                        error = %error, "service lookup failed");
                    // keep any stale list, but back off until the TTL expires
                    if let Some(cache) = self.cache.as_mut() {
                        cache.fetched_at = now;
                    }
                }
            }
        }

        match &self.cache {
            Some(cache) => cache.endpoints.clone(),
            None => {
                self.base
                    .set_status(format!("Could not get server list for {service}"));
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl Store for NetworkForwardStore {
    fn base(&self) -> &StoreBase {
        &self.base
    }

    fn configure(&mut self, config: &StoreConfig) {
        self.config = config.clone();
        // a service name takes precedence over a fixed host and port
        if let Some(service) = config.str("service_name") {
            self.service = Some(service.to_string());
            self.service_options = config.str("service_options").unwrap_or("").to_string();
            self.service_cache_timeout = Duration::from_secs(config.uint(
                "service_cache_timeout",
                DEFAULT_SERVICE_CACHE_TIMEOUT_SECS,
            ));
        } else {
            self.service = None;
            self.remote_host = config.str("remote_host").unwrap_or("").to_string();
            self.remote_port = config.uint("remote_port", 0) as u16;
        }
        self.timeout = Duration::from_millis(config.uint("timeout", DEFAULT_TIMEOUT_MS));
        self.use_pool = config.flag("use_conn_pool", true);
    }

    async fn open(&mut self) -> bool {
        if self.opened {
            return true;
        }

        for endpoint in self.candidate_endpoints().await {
            if self.use_pool {
                let handle = self.ctx.pool.acquire(&endpoint);
                match handle.ensure_open(&*self.ctx.transport, self.timeout).await {
                    Ok(()) => {
                        info!(category = %self.base.category, endpoint = %endpoint,
                            "connected through pool");
                        self.conn = Conn::Pooled(handle);
                        self.opened = true;
                    }
                    Err(error) => {
                        warn!(category = %self.base.category, endpoint = %endpoint,
                            error = %error, "connect failed");
                        self.ctx.pool.release(handle).await;
                    }
                }
            } else {
                match self.ctx.transport.connect(&endpoint, self.timeout).await {
                    Ok(conn) => {
                        info!(category = %self.base.category, endpoint = %endpoint,
                            "connected");
                        self.conn = Conn::Private(conn);
                        self.opened = true;
                    }
                    Err(error) => {
                        warn!(category = %self.base.category, endpoint = %endpoint,
                            error = %error, "connect failed");
                    }
                }
            }
            if self.opened {
                self.base.clear_status();
                return true;
            }
        }

        if self.base.status.is_healthy() {
            self.base.set_status("Failed to connect");
        }
        false
    }

    fn is_open(&self) -> bool {
        self.opened
    }

    async fn close(&mut self) {
        if !self.opened {
            return;
        }
        self.opened = false;
        match std::mem::replace(&mut self.conn, Conn::None) {
            Conn::Pooled(handle) => self.ctx.pool.release(handle).await,
            Conn::Private(mut conn) => conn.shutdown().await,
            Conn::None => {}
        }
    }

    async fn handle_messages(&mut self, batch: &mut Batch) -> bool {
        if !self.opened {
            warn!(category = %self.base.category,
                "handle_messages called on a closed network store");
            return false;
        }

        let result = match &mut self.conn {
            Conn::Pooled(handle) => handle.send(batch).await,
            Conn::Private(conn) => conn.send_batch(batch).await,
            Conn::None => Err(NetError::NotConnected),
        };

        match result {
            Ok(()) => {
                batch.clear();
                true
            }
            Err(error) => {
                warn!(category = %self.base.category, error = %error,
                    "forwarding batch failed");
                self.base.set_status("Failed to send to remote server");
                self.close().await;
                false
            }
        }
    }

    async fn periodic_check(&mut self) {}

    async fn flush(&mut self) {}

    fn copy(&self, category: &str) -> Box<dyn Store> {
        let mut copied = NetworkForwardStore::new(
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
#[path = "network_tests.rs"]
mod tests;
