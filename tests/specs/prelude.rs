//! Shared world for spec tests: one store context wired to fakes, a
//! scratch directory for file sinks, and batch helpers.

use std::sync::Arc;

use tempfile::TempDir;
use tributary_adapters::{
    FakeKvConnector, FakeNotifier, FakeResolver, FakeTransport,
};
use tributary_core::{FakeClock, Message, StoreConfig};
use tributary_store::StoreContext;

pub struct World {
    pub ctx: StoreContext,
    pub clock: FakeClock,
    pub transport: FakeTransport,
    pub kv: FakeKvConnector,
    pub dir: TempDir,
}

pub fn world() -> World {
    let clock = FakeClock::new();
    let transport = FakeTransport::new();
    let kv = FakeKvConnector::new();
    let ctx = StoreContext::new(
        Arc::new(clock.clone()),
        Arc::new(transport.clone()),
        Arc::new(FakeResolver::new()),
        Arc::new(kv.clone()),
        Arc::new(FakeNotifier::new()),
    );
    World {
        ctx,
        clock,
        transport,
        kv,
        dir: TempDir::new().unwrap(),
    }
}

impl World {
    /// File-store options pointing at the scratch directory.
    pub fn file_config(&self) -> StoreConfig {
        StoreConfig::new()
            .with("file_path", self.dir.path().to_str().unwrap())
            .with("create_symlink", "no")
    }
}

pub fn msgs(category: &str, payloads: &[&str]) -> Vec<Message> {
    payloads
        .iter()
        .map(|payload| Message::new(category, payload.as_bytes()))
        .collect()
}

pub fn sent_payloads(transport: &FakeTransport) -> Vec<String> {
    transport
        .sent_messages()
        .iter()
        .map(|m| String::from_utf8_lossy(&m.payload).into_owned())
        .collect()
}
