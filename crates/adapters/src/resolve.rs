// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dynamic endpoint resolution.
//!
//! Network stores configured with a service name instead of a fixed
//! host:port look the service up through a `Resolver`. Callers cache the
//! result themselves with a TTL, so a resolver implementation stays
//! stateless.

use async_trait::async_trait;
use thiserror::Error;

use crate::forward::Endpoint;

/// Errors from service resolution
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("malformed service name: {0}")]
    MalformedService(String),
    #[error("service has no endpoints: {0}")]
    NoEndpoints(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[async_trait]
pub trait Resolver: Send + Sync {
    /// Resolves a service name to the endpoints currently serving it.
    /// `options` carries resolver-specific tuning and may be empty.
    async fn resolve(&self, service: &str, options: &str) -> Result<Vec<Endpoint>, ResolveError>;
}

/// Resolver backed by DNS. Expects `host:port` service names.
#[derive(Debug, Clone, Default)]
pub struct DnsResolver;

impl DnsResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Resolver for DnsResolver {
    async fn resolve(&self, service: &str, _options: &str) -> Result<Vec<Endpoint>, ResolveError> {
        let (host, port) = service
            .rsplit_once(':')
            .ok_or_else(|| ResolveError::MalformedService(service.to_string()))?;
        let port: u16 = port
            .parse()
            .map_err(|_| ResolveError::MalformedService(service.to_string()))?;

        let endpoints: Vec<Endpoint> = tokio::net::lookup_host((host, port))
            .await?
            .map(|addr| Endpoint::new(addr.ip().to_string(), addr.port()))
            .collect();
        if endpoints.is_empty() {
            return Err(ResolveError::NoEndpoints(service.to_string()));
        }
        Ok(endpoints)
    }
}

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeResolver;

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Fake resolver with scripted answers.
    #[derive(Clone, Default)]
    pub struct FakeResolver {
        state: Arc<Mutex<FakeState>>,
    }

    #[derive(Default)]
    struct FakeState {
        services: HashMap<String, Vec<Endpoint>>,
        lookups: usize,
        fail: bool,
    }

    impl FakeResolver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn script(&self, service: &str, endpoints: Vec<Endpoint>) {
            self.lock().services.insert(service.to_string(), endpoints);
        }

        pub fn fail_lookups(&self, fail: bool) {
            self.lock().fail = fail;
        }

        pub fn lookup_count(&self) -> usize {
            self.lock().lookups
        }

        fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
            self.state.lock().unwrap_or_else(|e| e.into_inner())
        }
    }

    #[async_trait]
    impl Resolver for FakeResolver {
        async fn resolve(
            &self,
            service: &str,
            _options: &str,
        ) -> Result<Vec<Endpoint>, ResolveError> {
            let mut state = self.lock();
            state.lookups += 1;
            if state.fail {
                return Err(ResolveError::NoEndpoints(service.to_string()));
            }
            match state.services.get(service) {
                Some(endpoints) if !endpoints.is_empty() => Ok(endpoints.clone()),
                _ => Err(ResolveError::NoEndpoints(service.to_string())),
            }
        }
    }
}
