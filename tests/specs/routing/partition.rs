//! Key partition specs
//!
//! A partition store routes on the key before the delimiter. Bucket 0 is
//! the catch-all for unkeyed traffic; keyed buckets are stable for the
//! life of a configuration, and across instances built from the same
//! configuration.

use std::fs;
use std::path::Path;

use tributary_core::StoreConfig;
use tributary_store::{build_store, TreeHandle};

use crate::prelude::*;

fn partition_config(w: &World, bucket_type: &str) -> StoreConfig {
    StoreConfig::new()
        .with("bucket_type", bucket_type)
        .with("num_buckets", "3")
        .with_child("bucket", w.file_config().with("type", "file"))
}

fn partition_tree(w: &World, config: &StoreConfig) -> TreeHandle {
    let store = build_store(&w.ctx, "bucket", "web", false, None, false, config).unwrap();
    TreeHandle::new(store)
}

/// Per-bucket file contents, indexed 0..=num_buckets.
fn bucket_files(dir: &Path, buckets: u64) -> Vec<String> {
    (0..=buckets)
        .map(|index| {
            let name = format!("web_{index:03}");
            fs::read_to_string(dir.join(&name).join(format!("{name}_00000")))
                .unwrap_or_default()
        })
        .collect()
}

#[tokio::test]
async fn equal_keys_always_pick_the_same_bucket() {
    let w = world();
    let tree = partition_tree(&w, &partition_config(&w, "key_modulo"));

    tree.submit(&mut msgs("web", &["7:a"])).await;
    tree.submit(&mut msgs("web", &["7:b"])).await;
    tree.flush().await;

    // 7 mod 3 + 1
    assert_eq!(
        bucket_files(w.dir.path(), 3),
        vec!["", "", "7:a\n7:b\n", ""]
    );
}

#[tokio::test]
async fn unkeyed_messages_fall_into_the_catch_all() {
    let w = world();
    let tree = partition_tree(&w, &partition_config(&w, "key_modulo"));

    tree.submit(&mut msgs("web", &["bare", "9:keyed"])).await;
    tree.flush().await;

    let files = bucket_files(w.dir.path(), 3);
    assert_eq!(files[0], "bare\n");
    assert_eq!(files[1], "9:keyed\n");
}

#[tokio::test]
async fn remove_key_strips_the_routing_prefix() {
    let w = world();
    let config = partition_config(&w, "key_modulo").with("remove_key", "yes");
    let tree = partition_tree(&w, &config);

    tree.submit(&mut msgs("web", &["7:payload", "bare"])).await;
    tree.flush().await;

    let files = bucket_files(w.dir.path(), 3);
    // the catch-all keeps its message whole, keyed buckets drop the prefix
    assert_eq!(files[0], "bare\n");
    assert_eq!(files[2], "payload\n");
}

#[tokio::test]
async fn hashed_buckets_agree_across_instances() {
    let first = world();
    let second = world();
    let keys = ["alpha:1", "beta:2", "gamma:3", "alpha:4"];

    for w in [&first, &second] {
        let tree = partition_tree(w, &partition_config(w, "key_hash"));
        tree.submit(&mut msgs("web", &keys)).await;
        tree.flush().await;
    }

    let files = bucket_files(first.dir.path(), 3);
    assert_eq!(files, bucket_files(second.dir.path(), 3));

    // and alpha's two messages share one bucket
    let alpha_bucket = files
        .iter()
        .position(|content| content.contains("alpha:1"))
        .unwrap();
    assert!(files[alpha_bucket].contains("alpha:4"));
}
