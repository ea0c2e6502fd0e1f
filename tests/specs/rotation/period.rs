//! Scheduled rotation specs
//!
//! Rotating stores put the creation date in the file name. Hourly files
//! cut over at every hour boundary; daily files wait for the configured
//! hour and minute on a later date.

use std::fs;

use chrono::{TimeZone, Utc};
use tributary_store::{build_store, TreeHandle};

use crate::prelude::*;

#[tokio::test]
async fn hourly_files_cut_over_at_the_hour_boundary() {
    let w = world();
    w.clock
        .set_wall(Utc.with_ymd_and_hms(2009, 5, 17, 23, 50, 0).unwrap());
    let config = w.file_config().with("rotate_period", "hourly");
    let store = build_store(&w.ctx, "file", "web", false, None, false, &config).unwrap();
    let tree = TreeHandle::new(store);

    tree.submit(&mut msgs("web", &["late"])).await;
    w.clock
        .set_wall(Utc.with_ymd_and_hms(2009, 5, 18, 0, 5, 0).unwrap());
    tree.periodic_check().await;
    tree.submit(&mut msgs("web", &["early"])).await;
    tree.flush().await;

    assert_eq!(
        fs::read_to_string(w.dir.path().join("web-2009-05-17_00000")).unwrap(),
        "late\n"
    );
    assert_eq!(
        fs::read_to_string(w.dir.path().join("web-2009-05-18_00000")).unwrap(),
        "early\n"
    );
}

#[tokio::test]
async fn daily_files_wait_for_the_configured_time() {
    let w = world();
    w.clock
        .set_wall(Utc.with_ymd_and_hms(2009, 5, 17, 1, 59, 0).unwrap());
    let config = w
        .file_config()
        .with("rotate_period", "daily")
        .with("rotate_hour", "2")
        .with("rotate_minute", "0");
    let store = build_store(&w.ctx, "file", "web", false, None, false, &config).unwrap();
    let tree = TreeHandle::new(store);

    tree.submit(&mut msgs("web", &["one"])).await;

    // later the same day: not due, whatever the hour
    w.clock
        .set_wall(Utc.with_ymd_and_hms(2009, 5, 17, 3, 0, 0).unwrap());
    tree.periodic_check().await;

    // next day but before the rotation time: still not due
    w.clock
        .set_wall(Utc.with_ymd_and_hms(2009, 5, 18, 1, 0, 0).unwrap());
    tree.periodic_check().await;
    tree.submit(&mut msgs("web", &["two"])).await;

    // past 02:00 on a later date: due
    w.clock
        .set_wall(Utc.with_ymd_and_hms(2009, 5, 18, 2, 1, 0).unwrap());
    tree.periodic_check().await;
    tree.submit(&mut msgs("web", &["three"])).await;
    tree.flush().await;

    assert_eq!(
        fs::read_to_string(w.dir.path().join("web-2009-05-17_00000")).unwrap(),
        "one\ntwo\n"
    );
    assert_eq!(
        fs::read_to_string(w.dir.path().join("web-2009-05-18_00000")).unwrap(),
        "three\n"
    );
}
