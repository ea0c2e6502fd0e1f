//! Size-based rotation specs
//!
//! Once an open file's byte count passes `max_size`, the next periodic
//! tick cuts over to a fresh file with the next numeric suffix. The full
//! file is never written to again.

use std::fs;

use tributary_core::message;
use tributary_store::{build_store, TreeHandle};

use crate::prelude::*;

#[tokio::test]
async fn exceeding_max_size_rotates_on_the_next_tick() {
    let w = world();
    let config = w.file_config().with("max_size", "10");
    let store = build_store(&w.ctx, "file", "web", false, None, false, &config).unwrap();
    let tree = TreeHandle::new(store);

    tree.submit(&mut msgs("web", &["0123456789"])).await;
    tree.periodic_check().await;
    tree.submit(&mut msgs("web", &["next"])).await;
    tree.flush().await;

    assert_eq!(
        fs::read_to_string(w.dir.path().join("web_00000")).unwrap(),
        "0123456789\n"
    );
    assert_eq!(
        fs::read_to_string(w.dir.path().join("web_00001")).unwrap(),
        "next\n"
    );
}

#[tokio::test]
async fn a_full_file_is_never_touched_again() {
    let w = world();
    let config = w.file_config().with("max_size", "4");
    let store = build_store(&w.ctx, "file", "web", false, None, false, &config).unwrap();
    let tree = TreeHandle::new(store);

    tree.submit(&mut msgs("web", &["hello"])).await;
    tree.periodic_check().await;
    let full_len = fs::metadata(w.dir.path().join("web_00000")).unwrap().len();

    for _ in 0..3 {
        tree.submit(&mut msgs("web", &["more"])).await;
        tree.periodic_check().await;
    }

    assert_eq!(
        fs::metadata(w.dir.path().join("web_00000")).unwrap().len(),
        full_len
    );
}

#[tokio::test]
async fn a_batch_is_never_split_by_rotation() {
    let w = world();
    let config = w.file_config().with("max_size", "4");
    let store = build_store(&w.ctx, "file", "web", false, None, false, &config).unwrap();
    let tree = TreeHandle::new(store);

    // far past max_size in one call; rotation only happens between calls
    tree.submit(&mut msgs("web", &["aaaa", "bbbb", "cccc"])).await;
    tree.flush().await;

    assert_eq!(
        fs::read_to_string(w.dir.path().join("web_00000")).unwrap(),
        "aaaa\nbbbb\ncccc\n"
    );
}

#[tokio::test]
async fn framed_files_rotate_inside_the_write_path() {
    let w = world();
    let config = w.file_config().with("max_size", "10");
    let store =
        build_store(&w.ctx, "thriftfile", "web", false, None, false, &config).unwrap();
    let tree = TreeHandle::new(store);

    tree.submit(&mut msgs("web", &["first"])).await;
    tree.submit(&mut msgs("web", &["second"])).await;
    tree.flush().await;

    let (first, _) =
        message::decode_batch(&fs::read(w.dir.path().join("web_00000")).unwrap());
    let (second, _) =
        message::decode_batch(&fs::read(w.dir.path().join("web_00001")).unwrap());
    assert_eq!(first, msgs("web", &["first"]));
    assert_eq!(second, msgs("web", &["second"]));
}
