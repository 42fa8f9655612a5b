/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::ops::ControlFlow;

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;

use crate::error::Error;
use crate::operation::{TransferContext, MAX_CONSECUTIVE_ERRORS};
use crate::phase::PhaseWorker;
use crate::registry::FrozenKeys;
use crate::store::ObjectStore;
use crate::types::ObjectKey;

/// State shared by the download workers of one loop
#[derive(Debug)]
pub struct DownloadState {
    keys: FrozenKeys,
}

impl DownloadState {
    /// Download the given keys
    pub fn new(keys: FrozenKeys) -> Self {
        Self { keys }
    }
}

/// Context of the download phase
pub type DownloadContext = TransferContext<DownloadState>;

/// Downloads every uploaded key once, starting at a random position.
///
/// Workers don't partition the keys between them; the same object may be fetched by several
/// workers. A worker stops after [`MAX_CONSECUTIVE_ERRORS`] failures, successes in between do
/// not reset the count.
#[derive(Debug)]
pub struct DownloadWorker {
    ctx: DownloadContext,
    offset: usize,
    visited: usize,
    errors: u32,
}

impl DownloadWorker {
    /// Create a worker for the download phase
    pub fn new(ctx: DownloadContext) -> Self {
        let len = ctx.state().keys.len();
        let offset = if len == 0 { 0 } else { fastrand::usize(..len) };
        Self {
            ctx,
            offset,
            visited: 0,
            errors: 0,
        }
    }
}

async fn download_object(store: &dyn ObjectStore, key: &ObjectKey) -> Result<u64, Error> {
    let mut body = store.get_object(key.as_str()).await?;
    let mut received = 0;
    while let Some(chunk) = body.try_next().await? {
        received += chunk.len() as u64;
    }
    Ok(received)
}

#[async_trait]
impl PhaseWorker for DownloadWorker {
    async fn step(&mut self) -> ControlFlow<()> {
        let keys = &self.ctx.state().keys;
        if self.visited >= keys.len() {
            return ControlFlow::Break(());
        }
        let Some(key) = keys.get_wrapping(self.offset + self.visited) else {
            return ControlFlow::Break(());
        };
        self.visited += 1;

        let counters = self.ctx.results().download();
        counters.claim();
        match download_object(self.ctx.store().as_ref(), key).await {
            Ok(received) => tracing::trace!("downloaded {key} ({received} bytes)"),
            Err(err) => {
                counters.record_failure();
                self.errors += 1;
                tracing::warn!("download of {key} failed: {}", DisplayErrorContext(&err));
                if self.errors >= MAX_CONSECUTIVE_ERRORS {
                    tracing::debug!("giving up after {} download errors", self.errors);
                    return ControlFlow::Break(());
                }
            }
        }
        ControlFlow::Continue(())
    }
}
