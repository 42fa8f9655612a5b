/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use crate::metrics::ResultAggregator;
use crate::store::ObjectStore;

/// Upload phase workers
pub mod upload;

/// Download phase workers
pub mod download;

/// Delete phase workers
pub mod delete;

/// Consecutive failures after which a download or delete worker gives up
pub const MAX_CONSECUTIVE_ERRORS: u32 = 3;

/// Container for maintaining context required by the workers of a phase.
///
/// `State` is whatever additional phase specific state is required.
#[derive(Debug)]
pub struct TransferContext<State> {
    store: Arc<dyn ObjectStore>,
    results: Arc<ResultAggregator>,
    state: Arc<State>,
}

impl<State> TransferContext<State> {
    /// Create a context shared by the workers of one phase
    pub fn new(store: Arc<dyn ObjectStore>, results: Arc<ResultAggregator>, state: State) -> Self {
        Self {
            store,
            results,
            state: Arc::new(state),
        }
    }

    /// The store to send requests to
    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Counters of the current loop
    pub fn results(&self) -> &ResultAggregator {
        &self.results
    }

    /// Phase specific state
    pub fn state(&self) -> &State {
        &self.state
    }
}

impl<State> Clone for TransferContext<State> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            results: self.results.clone(),
            state: self.state.clone(),
        }
    }
}
