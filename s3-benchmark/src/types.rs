/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;

const KEY_PREFIX: &str = "Object-";

/// Name of an object written by the upload phase, `Object-<n>` with `n >= 1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey(String);

impl ObjectKey {
    /// Derive the key for the given (1-based) object index.
    pub fn from_index(index: u64) -> Self {
        Self(format!("{KEY_PREFIX}{index}"))
    }

    /// The object index encoded in this key
    pub fn index(&self) -> Option<u64> {
        self.0.strip_prefix(KEY_PREFIX)?.parse().ok()
    }

    /// The key as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How each object is sent during the upload phase.
///
/// Selected once per run from the object size and the multipart threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStrategy {
    /// One `PutObject` request per object.
    SinglePart,

    /// A multipart upload with parts of `part_size` bytes (the last part carries the remainder).
    Multipart {
        /// Size of every part except the last
        part_size: u64,
    },
}

impl UploadStrategy {
    /// Objects strictly larger than the threshold are uploaded with multipart.
    pub fn select(object_size: u64, multipart_threshold: u64) -> Self {
        if object_size > multipart_threshold {
            UploadStrategy::Multipart {
                part_size: multipart_threshold,
            }
        } else {
            UploadStrategy::SinglePart
        }
    }

    /// Returns true for [`UploadStrategy::Multipart`]
    pub fn is_multipart(&self) -> bool {
        matches!(self, UploadStrategy::Multipart { .. })
    }
}

/// What to do when the benchmark bucket can't be created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BucketCreationPolicy {
    /// Treat the failure as fatal and stop before any phase runs.
    #[default]
    Fail,

    /// Log a warning and continue, assuming the bucket is usable.
    Ignore,
}

/// Result of asking the store to create the bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BucketStatus {
    /// The bucket was created by this request
    Created,
    /// The bucket already existed (owned by the caller or not)
    AlreadyExists,
}

/// One of the three workloads driven per loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// PUT every object
    Upload,
    /// GET the objects created by the upload phase
    Download,
    /// DELETE the objects created by the upload phase
    Delete,
}

impl Phase {
    /// HTTP verb used to label the phase in reports
    pub fn verb(&self) -> &'static str {
        match self {
            Phase::Upload => "PUT",
            Phase::Download => "GET",
            Phase::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}
