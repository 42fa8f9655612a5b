/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Fixed duration worker pools.
//!
//! A phase spawns a fixed number of workers that repeatedly perform one unit of work until
//! the [`RunWindow`] closes or the worker runs out of work. The deadline is checked before
//! every unit of work; a request that is already in flight when the window closes is allowed
//! to finish, so a phase overruns its window by at most one request per worker.

use std::ops::ControlFlow;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use aws_smithy_async::time::SharedTimeSource;
use tokio::task::JoinSet;
use tracing::Instrument;

use crate::types::Phase;

/// Start and end of a phase, read from an injectable clock.
#[derive(Debug, Clone)]
pub struct RunWindow {
    start: SystemTime,
    end: SystemTime,
    time_source: SharedTimeSource,
}

impl RunWindow {
    /// Open a window of `duration` starting now
    pub fn new(duration: Duration, time_source: SharedTimeSource) -> Self {
        let start = time_source.now();
        Self {
            start,
            end: start + duration,
            time_source,
        }
    }

    /// Returns true while workers may start new units of work
    pub fn is_open(&self) -> bool {
        self.time_source.now() < self.end
    }

    /// Time since the window opened
    pub fn elapsed(&self) -> Duration {
        self.time_source
            .now()
            .duration_since(self.start)
            .unwrap_or_default()
    }

    /// When the window opened
    pub fn start(&self) -> SystemTime {
        self.start
    }

    /// When the window closes
    pub fn end(&self) -> SystemTime {
        self.end
    }
}

/// One worker of a phase.
#[async_trait]
pub trait PhaseWorker: Send + 'static {
    /// Perform one unit of work.
    ///
    /// Returning [`ControlFlow::Break`] stops this worker before the window closes, either
    /// because there is no work left or because it gave up after repeated errors.
    async fn step(&mut self) -> ControlFlow<()>;
}

/// Run `workers` concurrent workers built by `make_worker` until the window closes or every
/// worker stopped on its own, and return the elapsed time once all of them have been joined.
///
/// A panicking worker is logged and does not affect the others.
pub async fn run_phase<W, F>(
    phase: Phase,
    workers: usize,
    window: &RunWindow,
    mut make_worker: F,
) -> Duration
where
    W: PhaseWorker,
    F: FnMut(usize) -> W,
{
    let mut tasks = JoinSet::new();
    for i in 0..workers {
        let worker = make_worker(i);
        let span = match phase {
            Phase::Upload => tracing::debug_span!("object-uploader", worker = i),
            Phase::Download => tracing::debug_span!("object-downloader", worker = i),
            Phase::Delete => tracing::debug_span!("object-deleter", worker = i),
        };
        tasks.spawn(drive(worker, window.clone()).instrument(span));
    }

    while let Some(join_result) = tasks.join_next().await {
        if let Err(err) = join_result {
            tracing::error!("{phase} worker terminated abnormally: {err}");
        }
    }

    window.elapsed()
}

async fn drive<W: PhaseWorker>(mut worker: W, window: RunWindow) {
    let mut steps = 0u64;
    while window.is_open() {
        if worker.step().await.is_break() {
            tracing::debug!("worker out of work after {steps} operations");
            return;
        }
        steps += 1;
    }
    tracing::debug!("run window closed, worker finished after {steps} operations");
}
