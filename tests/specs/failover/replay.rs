//! Backlog replay specs
//!
//! Once the primary recovers, the spilled backlog drains oldest-first;
//! the secondary reports empty only after full replay, and an interrupted
//! replay neither loses nor duplicates messages.

use std::fs;
use std::time::Duration;

use tributary_core::StoreConfig;
use tributary_store::{build_store, TreeHandle};

use crate::prelude::*;

fn buffer_tree(w: &World, extra: StoreConfig) -> TreeHandle {
    let config = extra
        .with("retry_interval", "30")
        .with("retry_interval_range", "0")
        .with_child(
            "primary",
            StoreConfig::new()
                .with("type", "network")
                .with("remote_host", "collector.internal")
                .with("remote_port", "1463"),
        )
        .with_child("secondary", w.file_config().with("type", "file"));
    let store =
        build_store(&w.ctx, "buffer", "web", false, None, false, &config).unwrap();
    TreeHandle::new(store)
}

fn spill_dir_is_empty(w: &World) -> bool {
    fs::read_dir(w.dir.path()).unwrap().next().is_none()
}

#[tokio::test]
async fn recovery_replays_the_backlog_in_order() {
    let w = world();
    w.transport.refuse_connects(true);
    let tree = buffer_tree(&w, StoreConfig::new());

    tree.submit(&mut msgs("web", &["a", "b"])).await;
    tree.submit(&mut msgs("web", &["c"])).await;

    w.transport.refuse_connects(false);
    w.clock.advance(Duration::from_secs(31));
    tree.periodic_check().await; // reconnect
    tree.periodic_check().await; // drain the spill file
    tree.periodic_check().await; // empty again, back to streaming

    assert!(tree.submit(&mut msgs("web", &["d"])).await);
    assert_eq!(sent_payloads(&w.transport), vec!["a", "b", "c", "d"]);
    assert!(spill_dir_is_empty(&w));
}

#[tokio::test]
async fn an_interrupted_replay_keeps_every_message_exactly_once() {
    let w = world();
    w.transport.refuse_connects(true);
    let tree = buffer_tree(&w, StoreConfig::new());
    tree.submit(&mut msgs("web", &["a", "b", "c"])).await;

    // the first recovery attempt connects but cannot send
    w.transport.refuse_connects(false);
    w.transport.fail_sends(true);
    w.clock.advance(Duration::from_secs(31));
    tree.periodic_check().await;
    tree.periodic_check().await;
    assert!(w.transport.sent().is_empty());
    assert!(!spill_dir_is_empty(&w));

    w.transport.fail_sends(false);
    w.clock.advance(Duration::from_secs(31));
    tree.periodic_check().await;
    tree.periodic_check().await;
    tree.periodic_check().await;

    assert_eq!(sent_payloads(&w.transport), vec!["a", "b", "c"]);
    assert!(spill_dir_is_empty(&w));
}

#[tokio::test]
async fn the_queue_bound_is_the_admission_control() {
    let w = world();
    w.transport.refuse_connects(true);
    let tree = buffer_tree(&w, StoreConfig::new().with("max_queue_length", "2"));

    assert!(tree.submit(&mut msgs("web", &["a", "b"])).await);

    let mut overflow = msgs("web", &["c"]);
    assert!(!tree.submit(&mut overflow).await);
    assert_eq!(overflow.len(), 1);
    assert_eq!(tree.status().await, "Buffer queue is full");
}
