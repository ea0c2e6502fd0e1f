//! Category routing specs
//!
//! One router child per distinct category, created lazily and reused for
//! the category's lifetime so its file keeps growing instead of being
//! recreated per message.

use std::fs;

use tributary_core::{Message, StoreConfig};
use tributary_store::{build_store, TreeHandle};

use crate::prelude::*;

fn category_tree(w: &World) -> TreeHandle {
    let config =
        StoreConfig::new().with_child("model", w.file_config().with("type", "file"));
    let store =
        build_store(&w.ctx, "category", "default", true, None, false, &config).unwrap();
    TreeHandle::new(store)
}

#[tokio::test]
async fn mixed_traffic_lands_in_per_category_files() {
    let w = world();
    let tree = category_tree(&w);

    let mut batch = vec![
        Message::new("web", &b"pageview"[..]),
        Message::new("app", &b"crash"[..]),
        Message::new("web", &b"click"[..]),
    ];
    assert!(tree.submit(&mut batch).await);
    tree.flush().await;

    assert_eq!(
        fs::read_to_string(w.dir.path().join("web/web_00000")).unwrap(),
        "pageview\nclick\n"
    );
    assert_eq!(
        fs::read_to_string(w.dir.path().join("app/app_00000")).unwrap(),
        "crash\n"
    );
}

#[tokio::test]
async fn sequential_batches_reuse_the_same_child() {
    let w = world();
    let tree = category_tree(&w);

    tree.submit(&mut msgs("web", &["one"])).await;
    tree.submit(&mut msgs("web", &["two"])).await;
    tree.flush().await;

    // cumulative writes in one file, not a fresh child per batch
    assert_eq!(
        fs::read_to_string(w.dir.path().join("web/web_00000")).unwrap(),
        "one\ntwo\n"
    );
    assert_eq!(fs::read_dir(w.dir.path().join("web")).unwrap().count(), 1);
}

#[tokio::test]
async fn children_appear_only_for_seen_categories() {
    let w = world();
    let tree = category_tree(&w);

    tree.submit(&mut msgs("web", &["only"])).await;

    assert!(w.dir.path().join("web").exists());
    assert_eq!(fs::read_dir(w.dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn multifile_is_the_single_level_shorthand() {
    let w = world();
    let store =
        build_store(&w.ctx, "multifile", "default", true, None, false, &w.file_config())
            .unwrap();
    let tree = TreeHandle::new(store);

    let mut batch = vec![
        Message::new("web", &b"pageview"[..]),
        Message::new("app", &b"crash"[..]),
    ];
    assert!(tree.submit(&mut batch).await);
    tree.flush().await;

    assert_eq!(
        fs::read_to_string(w.dir.path().join("web/web_00000")).unwrap(),
        "pageview\n"
    );
    assert_eq!(
        fs::read_to_string(w.dir.path().join("app/app_00000")).unwrap(),
        "crash\n"
    );
}
