/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! S3 Benchmark
//!
//! Measures PUT, GET and DELETE throughput of an S3 compatible object store.
//!
//! Each benchmark loop runs three fixed duration phases with a pool of concurrent workers:
//!
//! 1. upload: every worker writes new `Object-<n>` objects, as single `PutObject` requests or
//!    as multipart uploads when the object size exceeds the multipart threshold,
//! 2. download: every worker reads back the objects confirmed by the upload phase,
//! 3. delete: the workers delete `Object-1` through `Object-<uploaded>`.
//!
//! Requests the store rejects are counted as slowdowns rather than retried, except for
//! multipart parts which are attempted up to three times.
//!
//! # Example
//!
//! ```no_run
//! # async fn run() -> Result<(), s3_benchmark::error::Error> {
//! use std::sync::Arc;
//! use std::time::Duration;
//! use s3_benchmark::{Benchmark, Config, ConfigLoader, S3Store};
//!
//! let client = ConfigLoader::default()
//!     .access_key("AKID")
//!     .secret_key("SECRET")
//!     .endpoint_url("http://127.0.0.1:9000")
//!     .load()
//!     .await?;
//! let config = Config::builder()
//!     .duration(Duration::from_secs(10))
//!     .threads(8)
//!     .build()?;
//! let store = S3Store::new(client, config.bucket());
//!
//! let benchmark = Benchmark::new(config, Arc::new(store));
//! benchmark.prepare().await?;
//! let report = benchmark.run().await;
//! println!("{}", report.summary("local", 8, "1M"));
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_debug_implementations,
    missing_docs,
    rustdoc::missing_crate_level_docs,
    unreachable_pub,
    rust_2018_idioms
)]

pub(crate) const MEBIBYTE: u64 = 1024 * 1024;

pub(crate) const GIBIBYTE: u64 = 1024 * MEBIBYTE;

/// Error types emitted by `s3-benchmark`
pub mod error;

/// Common types used by `s3-benchmark`
pub mod types;

/// Benchmark configuration
pub mod config;

/// Byte size parsing
pub mod size;

/// Random object bodies
pub mod payload;

/// Keys produced by the upload phase
pub mod registry;

/// Counters and throughput measurements
pub mod metrics;

/// Object store abstraction
pub mod store;

/// Fixed duration worker pools
pub mod phase;

/// Phase workers
pub mod operation;

/// Benchmark coordinator and reports
pub mod bench;

pub use self::bench::Benchmark;
pub use self::config::loader::ConfigLoader;
pub use self::config::Config;
pub use self::store::{ObjectStore, S3Store};
