//! Tree construction specs
//!
//! Configuration arrives already parsed; a TOML rendering of the nested
//! key/child shape deserializes straight into a `StoreConfig` and feeds
//! the factory.

use std::fs;

use tributary_core::{message, Message, StoreConfig};
use tributary_store::{build_store, BuildError, TreeHandle};

use crate::prelude::*;

#[tokio::test]
async fn a_toml_config_builds_a_working_tree() {
    let w = world();
    let text = format!(
        r#"
[values]
retry_interval = "30"
retry_interval_range = "0"

[children.primary.values]
type = "network"
remote_host = "collector.internal"
remote_port = "1463"

[children.secondary.values]
type = "file"
file_path = "{}"
create_symlink = "no"
"#,
        w.dir.path().display()
    );
    let config: StoreConfig = toml::from_str(&text).unwrap();

    w.transport.refuse_connects(true);
    let store =
        build_store(&w.ctx, "buffer", "web", false, None, false, &config).unwrap();
    let tree = TreeHandle::new(store);

    assert!(tree.submit(&mut msgs("web", &["spilled"])).await);
    let bytes = fs::read(w.dir.path().join("web_00000")).unwrap();
    let (records, _) = message::decode_batch(&bytes);
    assert_eq!(records, msgs("web", &["spilled"]));
}

#[tokio::test]
async fn unknown_types_fail_construction() {
    let w = world();
    let result = build_store(
        &w.ctx,
        "carrier-pigeon",
        "web",
        false,
        None,
        false,
        &StoreConfig::new(),
    );

    match result {
        Err(BuildError::UnknownKind(kind)) => assert_eq!(kind, "carrier-pigeon"),
        Ok(_) => panic!("carrier-pigeon should not build"),
    }
}

#[tokio::test]
async fn a_nested_tree_routes_end_to_end() {
    let w = world();
    w.transport.refuse_connects(true);

    // category router whose model is a buffer: each category gets its own
    // failover pair, spilling into per-category files while the collector
    // is unreachable
    let model = StoreConfig::new()
        .with("type", "buffer")
        .with("retry_interval", "30")
        .with_child(
            "primary",
            StoreConfig::new()
                .with("type", "network")
                .with("remote_host", "collector.internal")
                .with("remote_port", "1463"),
        )
        .with_child("secondary", w.file_config().with("type", "file"));
    let config = StoreConfig::new().with_child("model", model);
    let store =
        build_store(&w.ctx, "category", "default", true, None, false, &config).unwrap();
    let tree = TreeHandle::new(store);

    let mut batch = vec![
        Message::new("web", &b"pageview"[..]),
        Message::new("app", &b"crash"[..]),
    ];
    assert!(tree.submit(&mut batch).await);

    for (category, payload) in [("web", "pageview"), ("app", "crash")] {
        let bytes = fs::read(w.dir.path().join(format!("{category}_00000"))).unwrap();
        let (records, _) = message::decode_batch(&bytes);
        assert_eq!(records, vec![Message::new(category, payload.as_bytes())]);
    }
}
