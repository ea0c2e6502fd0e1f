// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::forward::{FakeTransport, Transport};
use crate::kv::{FakeKvConnector, KvConnector};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;

/// A writer that captures log output for testing
#[derive(Clone, Default)]
struct CapturedLogs {
    logs: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn new() -> Self {
        Self::default()
    }

    fn contents(&self) -> String {
        let logs = self.logs.lock().unwrap();
        String::from_utf8_lossy(&logs).to_string()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.logs.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run a test with captured tracing output
fn with_tracing<F, Fut>(f: F) -> (String, Fut::Output)
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future,
{
    let logs = CapturedLogs::new();
    let logs_clone = logs.clone();

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_writer(logs_clone)
        .with_ansi(false)
        .without_time()
        .finish();

    let result = tracing::subscriber::with_default(subscriber, || {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f())
    });

    (logs.contents(), result)
}

#[test]
fn traced_transport_logs_connect_and_send() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeTransport::new();
        let traced = TracedTransport::new(fake);
        let endpoint = Endpoint::new("collector.example.com", 1463);

        let mut conn = traced
            .connect(&endpoint, Duration::from_secs(1))
            .await?;
        conn.send_batch(&[Message::new("web", &b"x"[..])]).await?;
        conn.shutdown().await;
        Ok::<_, NetError>(())
    });

    assert!(result.is_ok(), "send should succeed: {:?}", result);
    assert!(
        logs.contains("connected"),
        "Should log connect. Logs:\n{}",
        logs
    );
    assert!(
        logs.contains("collector.example.com:1463"),
        "Should log the endpoint. Logs:\n{}",
        logs
    );
    assert!(
        logs.contains("batch forwarded"),
        "Should log the send. Logs:\n{}",
        logs
    );
}

#[test]
fn traced_transport_logs_connect_failure() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeTransport::new();
        fake.refuse_connects(true);
        let traced = TracedTransport::new(fake);

        traced
            .connect(&Endpoint::new("collector", 1463), Duration::from_secs(1))
            .await
            .map(|_| ())
    });

    assert!(result.is_err());
    assert!(
        logs.contains("connect failed"),
        "Should log the failure. Logs:\n{}",
        logs
    );
}

#[tokio::test]
async fn traced_transport_delegates_to_inner() {
    let fake = FakeTransport::new();
    let traced = TracedTransport::new(fake.clone());
    let endpoint = Endpoint::new("collector", 1463);

    let mut conn = traced
        .connect(&endpoint, Duration::from_secs(1))
        .await
        .unwrap();
    let batch = vec![Message::new("web", &b"payload"[..])];
    conn.send_batch(&batch).await.unwrap();

    assert_eq!(fake.sent_messages(), batch);
}

#[test]
fn traced_kv_logs_push_failure() {
    let (logs, result) = with_tracing(|| async {
        let fake = FakeKvConnector::new();
        fake.fail_pushes(true);
        let traced = TracedKvConnector::new(fake);

        let mut conn = traced.connect(&Endpoint::new("localhost", 6379)).await?;
        conn.push("log:1970:01:01:00:web", b"line").await
    });

    assert!(result.is_err());
    assert!(
        logs.contains("kv push failed"),
        "Should log the push failure. Logs:\n{}",
        logs
    );
}

#[tokio::test]
async fn traced_kv_delegates_to_inner() {
    let fake = FakeKvConnector::new();
    let traced = TracedKvConnector::new(fake.clone());

    let mut conn = traced
        .connect(&Endpoint::new("localhost", 6379))
        .await
        .unwrap();
    conn.push("log:1970:01:01:00:web", b"line").await.unwrap();
    conn.quit().await;

    let pushes = fake.pushes();
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].key, "log:1970:01:01:00:web");
}
