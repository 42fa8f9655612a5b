/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::ops::ControlFlow;

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;

use crate::operation::{TransferContext, MAX_CONSECUTIVE_ERRORS};
use crate::phase::PhaseWorker;
use crate::types::ObjectKey;

/// State shared by the delete workers of one loop
#[derive(Debug)]
pub struct DeleteState {
    uploaded: u64,
}

impl DeleteState {
    /// Delete `Object-1` through `Object-<uploaded>`
    pub fn new(uploaded: u64) -> Self {
        Self { uploaded }
    }
}

/// Context of the delete phase
pub type DeleteContext = TransferContext<DeleteState>;

/// Deletes objects by index until every uploaded index has been claimed.
///
/// A failed delete hands its index back so it is attempted again. After
/// [`MAX_CONSECUTIVE_ERRORS`] failures the worker stops.
#[derive(Debug)]
pub struct DeleteWorker {
    ctx: DeleteContext,
    errors: u32,
}

impl DeleteWorker {
    /// Create a worker for the delete phase
    pub fn new(ctx: DeleteContext) -> Self {
        Self { ctx, errors: 0 }
    }
}

#[async_trait]
impl PhaseWorker for DeleteWorker {
    async fn step(&mut self) -> ControlFlow<()> {
        let counters = self.ctx.results().delete();
        let index = counters.claim();
        if index > self.ctx.state().uploaded {
            counters.release();
            return ControlFlow::Break(());
        }

        let key = ObjectKey::from_index(index);
        match self.ctx.store().delete_object(key.as_str()).await {
            Ok(()) => tracing::trace!("deleted {key}"),
            Err(err) => {
                counters.record_failure();
                self.errors += 1;
                tracing::warn!("delete of {key} failed: {}", DisplayErrorContext(&err));
                if self.errors >= MAX_CONSECUTIVE_ERRORS {
                    tracing::debug!("giving up after {} delete errors", self.errors);
                    return ControlFlow::Break(());
                }
            }
        }
        ControlFlow::Continue(())
    }
}
