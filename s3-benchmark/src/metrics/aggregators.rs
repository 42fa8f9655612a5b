/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use crate::metrics::instruments::{Gauge, IncreasingCounter};
use crate::types::Phase;

/// Completed and throttled counts of one operation kind.
///
/// `completed` doubles as the index allocator: [`claim`](Self::claim) speculatively counts an
/// operation before it is sent and [`record_failure`](Self::record_failure) takes it back.
#[derive(Debug, Default)]
pub struct OperationCounters {
    completed: Gauge,
    throttled: IncreasingCounter,
}

impl OperationCounters {
    /// Count an operation about to be sent and return the new total (the 1-based index).
    pub fn claim(&self) -> u64 {
        self.completed.increment(1)
    }

    /// Undo a [`claim`](Self::claim) without counting a failure.
    pub fn release(&self) -> u64 {
        self.completed.decrement(1)
    }

    /// Undo a [`claim`](Self::claim) for an operation that failed.
    pub fn record_failure(&self) {
        self.throttled.increment(1);
        self.completed.decrement(1);
    }

    /// Operations counted as completed
    pub fn completed(&self) -> u64 {
        self.completed.value()
    }

    /// Operations that failed or were throttled
    pub fn throttled(&self) -> u64 {
        self.throttled.value()
    }

    /// Point in time copy of both counters
    pub fn snapshot(&self) -> OperationSnapshot {
        OperationSnapshot {
            completed: self.completed(),
            throttled: self.throttled(),
        }
    }
}

/// Values of [`OperationCounters`] at some point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OperationSnapshot {
    /// Operations counted as completed
    pub completed: u64,
    /// Operations that failed or were throttled
    pub throttled: u64,
}

/// Per loop counters shared by every worker of every phase.
#[derive(Debug, Default)]
pub struct ResultAggregator {
    upload: OperationCounters,
    download: OperationCounters,
    delete: OperationCounters,
}

impl ResultAggregator {
    /// Create a new aggregator with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Counters of the upload phase
    pub fn upload(&self) -> &OperationCounters {
        &self.upload
    }

    /// Counters of the download phase
    pub fn download(&self) -> &OperationCounters {
        &self.download
    }

    /// Counters of the delete phase
    pub fn delete(&self) -> &OperationCounters {
        &self.delete
    }

    /// Counters for the given phase
    pub fn phase(&self, phase: Phase) -> &OperationCounters {
        match phase {
            Phase::Upload => &self.upload,
            Phase::Download => &self.download,
            Phase::Delete => &self.delete,
        }
    }
}
