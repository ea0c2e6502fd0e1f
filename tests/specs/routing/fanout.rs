//! Fanout replication specs
//!
//! Every child sees every message. `report_success = all` keeps the
//! batch alive until each child lands it; `any` settles for one copy,
//! with failed children visible only through their status.

use std::fs;

use tributary_core::StoreConfig;
use tributary_store::{build_store, Store, TreeHandle};

use crate::prelude::*;

fn two_file_config(w: &World) -> StoreConfig {
    StoreConfig::new()
        .with_child(
            "store0",
            w.file_config().with("type", "file").with("sub_directory", "first"),
        )
        .with_child(
            "store1",
            w.file_config().with("type", "file").with("sub_directory", "second"),
        )
}

#[tokio::test]
async fn every_child_sees_every_message() {
    let w = world();
    let store =
        build_store(&w.ctx, "multi", "web", false, None, false, &two_file_config(&w))
            .unwrap();
    let tree = TreeHandle::new(store);

    assert!(tree.submit(&mut msgs("web", &["a", "b"])).await);
    tree.flush().await;

    for copy in ["first", "second"] {
        assert_eq!(
            fs::read_to_string(w.dir.path().join(copy).join("web_00000")).unwrap(),
            "a\nb\n"
        );
    }
}

fn kv_and_file_config(w: &World, policy: &str) -> StoreConfig {
    StoreConfig::new()
        .with("report_success", policy)
        .with_child("store0", StoreConfig::new().with("type", "redis"))
        .with_child("store1", w.file_config().with("type", "file"))
}

#[tokio::test]
async fn any_policy_succeeds_when_one_copy_lands() {
    let w = world();
    w.kv.refuse_connects(true);
    let mut store =
        build_store(&w.ctx, "multi", "web", false, None, false, &kv_and_file_config(&w, "any"))
            .unwrap();
    store.open().await;

    let mut batch = msgs("web", &["a", "b", "c"]);
    assert!(store.handle_messages(&mut batch).await);
    assert!(batch.is_empty());

    // the failure is not silent: the dead child's status says so
    assert!(!store.status().is_empty());
    assert_eq!(
        fs::read_to_string(w.dir.path().join("web_00000")).unwrap(),
        "a\nb\nc\n"
    );
}

#[tokio::test]
async fn all_policy_holds_the_batch_until_every_child_lands_it() {
    let w = world();
    w.kv.refuse_connects(true);
    let mut store =
        build_store(&w.ctx, "multi", "web", false, None, false, &kv_and_file_config(&w, "all"))
            .unwrap();
    store.open().await;

    let mut batch = msgs("web", &["a", "b", "c"]);
    assert!(!store.handle_messages(&mut batch).await);

    // the kv child took nothing, so the whole batch stays retryable,
    // even though the file child already wrote its copy
    assert_eq!(batch, msgs("web", &["a", "b", "c"]));
    assert_eq!(
        fs::read_to_string(w.dir.path().join("web_00000")).unwrap(),
        "a\nb\nc\n"
    );

    w.kv.refuse_connects(false);
    assert!(store.handle_messages(&mut batch).await);
    assert_eq!(w.kv.pushes().len(), 3);
}
