/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;
use std::time::Duration;

use s3_benchmark::bench::ClearedObjects;
use s3_benchmark::error::ErrorKind;
use s3_benchmark::types::{BucketCreationPolicy, Phase};
use s3_benchmark::{Benchmark, Config};

mod common;
use common::{CallCounts, InMemoryStore, ManualTimeSource};

fn base_config() -> s3_benchmark::config::Builder {
    Config::builder()
        .bucket("bench")
        .duration(Duration::from_millis(100))
        .threads(2)
        .object_size(1024)
}

#[tokio::test]
async fn test_prepare_creates_and_clears_bucket() {
    let store = Arc::new(
        InMemoryStore::new()
            .with_object("leftover-1", b"a")
            .with_object("leftover-2", b"b"),
    );
    let bench = Benchmark::new(base_config().build().unwrap(), store.clone());

    bench.prepare().await.unwrap();

    assert_eq!(1, CallCounts::get(&store.calls().create_bucket));
    assert!(store.keys().is_empty());
    assert_eq!(
        ClearedObjects {
            found: 0,
            remaining: 0
        },
        bench.clear_bucket().await.unwrap()
    );
}

#[tokio::test]
async fn test_clear_bucket_reports_found_objects() {
    let store = Arc::new(
        InMemoryStore::new()
            .with_object("leftover-1", b"a")
            .with_object("leftover-2", b"b"),
    );
    let bench = Benchmark::new(base_config().build().unwrap(), store.clone());

    let cleared = bench.clear_bucket().await.unwrap();

    assert_eq!(
        ClearedObjects {
            found: 2,
            remaining: 0
        },
        cleared
    );
}

#[tokio::test]
async fn test_keep_existing_objects() {
    let store = Arc::new(InMemoryStore::new().with_object("leftover-1", b"a"));
    let config = base_config().clear_bucket(false).build().unwrap();
    let bench = Benchmark::new(config, store.clone());

    bench.prepare().await.unwrap();

    assert_eq!(vec!["leftover-1".to_owned()], store.keys());
    assert_eq!(0, CallCounts::get(&store.calls().list_keys));
}

#[tokio::test]
async fn test_bucket_creation_failure_policy() {
    let store = Arc::new(InMemoryStore::new().fail_create_bucket());
    let fail_config = base_config()
        .bucket_creation_policy(BucketCreationPolicy::Fail)
        .build()
        .unwrap();
    let err = Benchmark::new(fail_config, store.clone())
        .prepare()
        .await
        .unwrap_err();
    assert_eq!(&ErrorKind::BucketUnavailable, err.kind());

    let ignore_config = base_config()
        .bucket_creation_policy(BucketCreationPolicy::Ignore)
        .build()
        .unwrap();
    Benchmark::new(ignore_config, store.clone())
        .prepare()
        .await
        .unwrap();
}

#[tokio::test]
async fn test_deterministic_loop_report() {
    let clock = ManualTimeSource::new();
    let store = Arc::new(InMemoryStore::new().with_clock(clock.clone(), Duration::from_secs(1)));
    let config = base_config()
        .duration(Duration::from_secs(5))
        .threads(1)
        .build()
        .unwrap();
    let bench = Benchmark::new(config, store.clone()).with_time_source(clock);

    let report = bench.run().await;

    assert_eq!(1, report.loops().len());
    let lines = report.loops()[0].to_string();
    let lines: Vec<_> = lines.lines().collect();
    assert_eq!(
        vec![
            "Loop 1: PUT time 5.0 secs, objects = 5, speed = 1.0 KiB/s, 1.0 operations/sec. Slowdowns = 0",
            "Loop 1: GET time 5.0 secs, objects = 5, speed = 1.0 KiB/s, 1.0 operations/sec. Slowdowns = 0",
            "Loop 1: DELETE time 5.0 secs, 1.0 deletes/sec. Slowdowns = 0",
        ],
        lines
    );
    assert!(store.keys().is_empty());
    assert_eq!(5, CallCounts::get(&store.calls().put_object));
    assert_eq!(5, CallCounts::get(&store.calls().get_object));
    assert_eq!(5, CallCounts::get(&store.calls().delete_object));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_each_loop_starts_from_an_empty_bucket() {
    let store = Arc::new(InMemoryStore::new().with_write_latency(Duration::from_millis(5)));
    let config = base_config().loops(3).build().unwrap();
    let bench = Benchmark::new(config, store.clone());

    let report = bench.run().await;

    assert_eq!(3, report.loops().len());
    for (i, loop_report) in report.loops().iter().enumerate() {
        assert_eq!(i as u32 + 1, loop_report.loop_number());
        assert_eq!(Phase::Upload, loop_report.upload().phase());
        assert!(loop_report.upload().objects() > 0);
        assert_eq!(
            loop_report.upload().objects(),
            loop_report.delete().objects()
        );
    }
    assert!(store.keys().is_empty());
    assert!(report.upload_speed() > 0.0);
}

#[tokio::test]
async fn test_multipart_objects_round_trip() {
    let store = Arc::new(InMemoryStore::new());
    let config = base_config()
        .threads(1)
        .object_size(2500)
        .multipart_threshold(1000)
        .build()
        .unwrap();
    let bench = Benchmark::new(config, store.clone());

    let report = bench.run().await;

    let loop_report = &report.loops()[0];
    assert!(loop_report.upload().objects() > 0);
    assert_eq!(
        loop_report.upload().objects(),
        loop_report.download().objects()
    );
    assert!(store.part_sizes().iter().all(|(_, size)| *size <= 1000));
    assert!(store.keys().is_empty());
}
