/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use aws_sdk_s3::error::DisplayErrorContext;
use aws_smithy_async::time::{SharedTimeSource, SystemTimeSource, TimeSource};

use crate::config::Config;
use crate::error::{self, Error, ErrorKind};
use crate::metrics::unit::ByteUnit;
use crate::metrics::{ResultAggregator, Throughput};
use crate::operation::delete::{DeleteState, DeleteWorker};
use crate::operation::download::{DownloadState, DownloadWorker};
use crate::operation::upload::{UploadState, UploadWorker};
use crate::operation::TransferContext;
use crate::payload::Payload;
use crate::phase::{self, RunWindow};
use crate::registry::KeyRegistry;
use crate::store::ObjectStore;
use crate::types::{BucketCreationPolicy, BucketStatus, Phase};

/// Measurements of one phase of one loop
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhaseStats {
    phase: Phase,
    elapsed: Duration,
    objects: u64,
    throttled: u64,
    object_size: u64,
}

impl PhaseStats {
    /// Create the measurements for `objects` operations on objects of `object_size` bytes
    pub fn new(
        phase: Phase,
        elapsed: Duration,
        objects: u64,
        throttled: u64,
        object_size: u64,
    ) -> Self {
        Self {
            phase,
            elapsed,
            objects,
            throttled,
            object_size,
        }
    }

    /// The phase measured
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Time from the start of the phase until its last worker finished
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Number of objects counted for the phase
    pub fn objects(&self) -> u64 {
        self.objects
    }

    /// Number of failed or throttled requests
    pub fn throttled(&self) -> u64 {
        self.throttled
    }

    /// Bytes moved per second
    pub fn throughput(&self) -> Throughput {
        Throughput::new(self.objects.saturating_mul(self.object_size), self.elapsed)
    }

    /// Objects per second, zero when no time elapsed
    pub fn ops_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.objects as f64 / secs
    }

    /// Throughput in MiB per second as reported in the summary
    pub fn mib_per_sec(&self) -> f64 {
        self.throughput().as_unit_per_sec(ByteUnit::Mebibyte)
    }
}

impl fmt::Display for PhaseStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.elapsed.as_secs_f64();
        match self.phase {
            Phase::Delete => write!(
                f,
                "DELETE time {secs:.1} secs, {:.1} deletes/sec. Slowdowns = {}",
                self.ops_per_sec(),
                self.throttled
            ),
            phase => write!(
                f,
                "{phase} time {secs:.1} secs, objects = {}, speed = {:.1}, {:.1} operations/sec. Slowdowns = {}",
                self.objects,
                self.throughput(),
                self.ops_per_sec(),
                self.throttled
            ),
        }
    }
}

/// Measurements of one benchmark loop
#[derive(Debug, Clone, PartialEq)]
pub struct LoopReport {
    loop_number: u32,
    upload: PhaseStats,
    download: PhaseStats,
    delete: PhaseStats,
}

impl LoopReport {
    /// 1-based loop number
    pub fn loop_number(&self) -> u32 {
        self.loop_number
    }

    /// Upload phase measurements
    pub fn upload(&self) -> &PhaseStats {
        &self.upload
    }

    /// Download phase measurements
    pub fn download(&self) -> &PhaseStats {
        &self.download
    }

    /// Delete phase measurements
    pub fn delete(&self) -> &PhaseStats {
        &self.delete
    }
}

impl fmt::Display for LoopReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.loop_number;
        writeln!(f, "Loop {n}: {}", self.upload)?;
        writeln!(f, "Loop {n}: {}", self.download)?;
        write!(f, "Loop {n}: {}", self.delete)
    }
}

/// Measurements of every loop of a run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BenchmarkReport {
    loops: Vec<LoopReport>,
}

impl BenchmarkReport {
    /// Reports of every loop in order
    pub fn loops(&self) -> &[LoopReport] {
        &self.loops
    }

    /// Upload MiB/s of the last loop
    pub fn upload_speed(&self) -> f64 {
        self.loops.last().map_or(0.0, |l| l.upload.mib_per_sec())
    }

    /// Download MiB/s of the last loop
    pub fn download_speed(&self) -> f64 {
        self.loops.last().map_or(0.0, |l| l.download.mib_per_sec())
    }

    /// The machine readable summary line `name-concurrency-size,<upload>,<download>`
    pub fn summary<'a>(
        &'a self,
        name: &'a str,
        concurrency: usize,
        size_label: &'a str,
    ) -> Summary<'a> {
        Summary {
            report: self,
            name,
            concurrency,
            size_label,
        }
    }
}

/// See [`BenchmarkReport::summary`]
#[derive(Debug)]
pub struct Summary<'a> {
    report: &'a BenchmarkReport,
    name: &'a str,
    concurrency: usize,
    size_label: &'a str,
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}-{},{:.2},{:.2}",
            self.name,
            self.concurrency,
            self.size_label,
            self.report.upload_speed(),
            self.report.download_speed()
        )
    }
}

/// First DNS label of an endpoint, e.g. `s3` for `https://s3.us-east-1.example.com:443`
pub fn endpoint_name(endpoint: &str) -> &str {
    let host = endpoint
        .split_once("://")
        .map_or(endpoint, |(_, rest)| rest);
    host.split(['.', ':', '/']).next().unwrap_or(host)
}

/// Objects found and left over when clearing the bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClearedObjects {
    /// Objects in the bucket before clearing
    pub found: usize,
    /// Objects still in the bucket afterwards
    pub remaining: usize,
}

/// Runs upload, download and delete phases against a store.
#[derive(Debug)]
pub struct Benchmark {
    config: Config,
    store: Arc<dyn ObjectStore>,
    payload: Payload,
    time_source: SharedTimeSource,
}

impl Benchmark {
    /// Create a benchmark with a freshly generated random payload
    pub fn new(config: Config, store: Arc<dyn ObjectStore>) -> Self {
        let payload = Payload::random(config.object_size());
        Self {
            config,
            store,
            payload,
            time_source: SharedTimeSource::new(SystemTimeSource::new()),
        }
    }

    /// Clock used for the run windows. Defaults to the system clock.
    pub fn with_time_source(mut self, time_source: impl TimeSource + 'static) -> Self {
        self.time_source = SharedTimeSource::new(time_source);
        self
    }

    /// The benchmark settings
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Create the bucket and, if configured, remove objects left over from earlier runs.
    pub async fn prepare(&self) -> Result<(), Error> {
        self.create_bucket().await?;
        if self.config.clear_bucket() {
            self.clear_bucket().await?;
        }
        Ok(())
    }

    async fn create_bucket(&self) -> Result<(), Error> {
        let bucket = self.config.bucket();
        match self.store.create_bucket().await {
            Ok(BucketStatus::Created) => tracing::info!("created bucket {bucket}"),
            Ok(BucketStatus::AlreadyExists) => tracing::debug!("bucket {bucket} already exists"),
            Err(err) => match self.config.bucket_creation_policy() {
                BucketCreationPolicy::Ignore => tracing::warn!(
                    "create bucket {bucket} failed, ignoring: {}",
                    DisplayErrorContext(&err)
                ),
                BucketCreationPolicy::Fail => {
                    return Err(error::from_kind(ErrorKind::BucketUnavailable)(err))
                }
            },
        }
        Ok(())
    }

    /// Delete every object currently in the bucket.
    ///
    /// Listing failures are fatal, individual delete failures are logged and show up as
    /// remaining objects.
    pub async fn clear_bucket(&self) -> Result<ClearedObjects, Error> {
        let list_failed = error::from_kind(ErrorKind::BucketUnavailable);
        let keys = self.store.list_keys().await.map_err(list_failed)?;
        if keys.is_empty() {
            return Ok(ClearedObjects {
                found: 0,
                remaining: 0,
            });
        }

        tracing::info!("found {} existing objects, deleting", keys.len());
        for key in &keys {
            if let Err(err) = self.store.delete_object(key).await {
                tracing::warn!("failed to delete {key}: {}", DisplayErrorContext(&err));
            }
        }

        let list_failed = error::from_kind(ErrorKind::BucketUnavailable);
        let remaining = self.store.list_keys().await.map_err(list_failed)?.len();
        tracing::info!("{remaining} objects remain after clearing the bucket");
        Ok(ClearedObjects {
            found: keys.len(),
            remaining,
        })
    }

    /// Run every configured loop and return the measurements
    pub async fn run(&self) -> BenchmarkReport {
        let mut loops = Vec::with_capacity(self.config.loops() as usize);
        for loop_number in 1..=self.config.loops() {
            loops.push(self.run_loop(loop_number).await);
        }
        BenchmarkReport { loops }
    }

    /// Run one upload, download and delete cycle with fresh counters and key registry
    pub async fn run_loop(&self, loop_number: u32) -> LoopReport {
        let results = Arc::new(ResultAggregator::new());
        let registry = Arc::new(KeyRegistry::new());
        let threads = self.config.threads();
        let object_size = self.payload.len();

        let window = self.window();
        let ctx = TransferContext::new(
            self.store.clone(),
            results.clone(),
            UploadState::new(
                self.payload.clone(),
                self.config.upload_strategy(),
                registry.clone(),
                window.clone(),
            ),
        );
        let elapsed = phase::run_phase(Phase::Upload, threads, &window, |_| {
            UploadWorker::new(ctx.clone())
        })
        .await;
        let uploaded = results.upload().snapshot();
        let upload = PhaseStats::new(
            Phase::Upload,
            elapsed,
            uploaded.completed,
            uploaded.throttled,
            object_size,
        );
        tracing::info!("Loop {loop_number}: {upload}");

        let keys = registry.snapshot();
        tracing::debug!("{} keys available for download", keys.len());
        let ctx = TransferContext::new(
            self.store.clone(),
            results.clone(),
            DownloadState::new(keys),
        );
        let elapsed = phase::run_phase(Phase::Download, threads, &self.window(), |_| {
            DownloadWorker::new(ctx.clone())
        })
        .await;
        let downloaded = results.download().snapshot();
        let download = PhaseStats::new(
            Phase::Download,
            elapsed,
            downloaded.completed,
            downloaded.throttled,
            object_size,
        );
        tracing::info!("Loop {loop_number}: {download}");

        let ctx = TransferContext::new(
            self.store.clone(),
            results.clone(),
            DeleteState::new(uploaded.completed),
        );
        let elapsed = phase::run_phase(Phase::Delete, threads, &self.window(), |_| {
            DeleteWorker::new(ctx.clone())
        })
        .await;
        let delete = PhaseStats::new(
            Phase::Delete,
            elapsed,
            uploaded.completed,
            results.delete().throttled(),
            object_size,
        );
        tracing::info!("Loop {loop_number}: {delete}");

        LoopReport {
            loop_number,
            upload,
            download,
            delete,
        }
    }

    fn window(&self) -> RunWindow {
        RunWindow::new(self.config.duration(), self.time_source.clone())
    }
}
