/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::ops::ControlFlow;
use std::sync::Arc;

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;

use crate::error::{Error, ErrorKind};
use crate::operation::TransferContext;
use crate::payload::Payload;
use crate::phase::{PhaseWorker, RunWindow};
use crate::registry::KeyRegistry;
use crate::types::{ObjectKey, UploadStrategy};

/// Multipart upload of a single object
pub mod multipart;

/// State shared by the upload workers of one loop
#[derive(Debug)]
pub struct UploadState {
    payload: Payload,
    strategy: UploadStrategy,
    registry: Arc<KeyRegistry>,
    window: RunWindow,
}

impl UploadState {
    /// Upload `payload` with `strategy`, recording confirmed keys in `registry`.
    ///
    /// Multipart uploads stop sending parts once `window` has closed.
    pub fn new(
        payload: Payload,
        strategy: UploadStrategy,
        registry: Arc<KeyRegistry>,
        window: RunWindow,
    ) -> Self {
        Self {
            payload,
            strategy,
            registry,
            window,
        }
    }

    /// The object body
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// The window of the upload phase
    pub fn window(&self) -> &RunWindow {
        &self.window
    }
}

/// Context of the upload phase
pub type UploadContext = TransferContext<UploadState>;

/// Uploads a new object per unit of work until the phase ends
#[derive(Debug)]
pub struct UploadWorker {
    ctx: UploadContext,
}

impl UploadWorker {
    /// Create a worker for the upload phase
    pub fn new(ctx: UploadContext) -> Self {
        Self { ctx }
    }

    async fn upload(&self, key: &ObjectKey) -> Result<(), Error> {
        let state = self.ctx.state();
        match state.strategy {
            UploadStrategy::SinglePart => {
                self.ctx
                    .store()
                    .put_object(key.as_str(), state.payload.bytes())
                    .await
            }
            UploadStrategy::Multipart { part_size } => {
                multipart::upload(&self.ctx, key, part_size).await
            }
        }
    }
}

#[async_trait]
impl PhaseWorker for UploadWorker {
    async fn step(&mut self) -> ControlFlow<()> {
        let counters = self.ctx.results().upload();
        let key = ObjectKey::from_index(counters.claim());

        match self.upload(&key).await {
            Ok(()) => {
                self.ctx.state().registry.insert(key.clone());
                tracing::trace!("uploaded {key}");
            }
            Err(err) if err.kind() == &ErrorKind::OperationCancelled => {
                counters.release();
                tracing::debug!("upload of {key} cancelled: {}", DisplayErrorContext(&err));
            }
            Err(err) => {
                counters.record_failure();
                tracing::warn!("upload of {key} failed: {}", DisplayErrorContext(&err));
            }
        }
        ControlFlow::Continue(())
    }
}
