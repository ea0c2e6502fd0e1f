//! Primary-down spill specs
//!
//! A buffer with an unreachable forwarding primary must keep accepting
//! writes by spilling them durably to its file secondary, and must say
//! so loudly in its status rather than failing silently.

use std::fs;

use tributary_core::{message, StoreConfig};
use tributary_store::{build_store, TreeHandle};

use crate::prelude::*;

fn buffer_config(w: &World) -> StoreConfig {
    StoreConfig::new()
        .with("retry_interval", "30")
        .with("retry_interval_range", "0")
        .with_child(
            "primary",
            StoreConfig::new()
                .with("type", "network")
                .with("remote_host", "collector.internal")
                .with("remote_port", "1463"),
        )
        .with_child("secondary", w.file_config().with("type", "file"))
}

fn buffer_tree(w: &World) -> TreeHandle {
    let store = build_store(&w.ctx, "buffer", "web", false, None, false, &buffer_config(w))
        .unwrap();
    TreeHandle::new(store)
}

#[tokio::test]
async fn an_unreachable_primary_spills_to_the_secondary() {
    let w = world();
    w.transport.refuse_connects(true);
    let tree = buffer_tree(&w);

    let mut batch = msgs("web", &["a", "b", "c"]);
    assert!(tree.submit(&mut batch).await);
    assert!(batch.is_empty());

    // durably on disk, nothing on the wire
    let spilled = fs::read(w.dir.path().join("web_00000")).unwrap();
    let (records, _) = message::decode_batch(&spilled);
    assert_eq!(records, msgs("web", &["a", "b", "c"]));
    assert!(w.transport.sent().is_empty());
    assert!(!tree.status().await.is_empty());
}

#[tokio::test]
async fn a_healthy_primary_streams_without_touching_disk() {
    let w = world();
    let tree = buffer_tree(&w);

    let mut warmup = Vec::new();
    assert!(tree.submit(&mut warmup).await);
    tree.periodic_check().await;

    assert!(tree.submit(&mut msgs("web", &["pageview"])).await);
    assert_eq!(sent_payloads(&w.transport), vec!["pageview"]);
    assert_eq!(fs::read_dir(w.dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn a_dead_secondary_rejects_explicitly() {
    let w = world();
    w.transport.refuse_connects(true);
    let blocker = w.dir.path().join("block");
    fs::write(&blocker, b"not a directory").unwrap();
    let config = buffer_config(&w).with_child(
        "secondary",
        StoreConfig::new()
            .with("type", "file")
            .with("file_path", blocker.join("spill").to_str().unwrap()),
    );
    let store =
        build_store(&w.ctx, "buffer", "web", false, None, false, &config).unwrap();
    let tree = TreeHandle::new(store);

    let mut batch = msgs("web", &["a", "b"]);
    assert!(!tree.submit(&mut batch).await);
    assert_eq!(batch.len(), 2);
    assert!(!tree.status().await.is_empty());
}
