/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::time::Duration;

use crate::error::{self, Error};
use crate::types::{BucketCreationPolicy, UploadStrategy};
use crate::{GIBIBYTE, MEBIBYTE};

/// S3 client construction
pub mod loader;

/// Largest multipart threshold (and therefore part size) accepted
pub const MAX_MULTIPART_THRESHOLD: u64 = 5 * GIBIBYTE;

const DEFAULT_BUCKET: &str = "loadgen";
const DEFAULT_DURATION: Duration = Duration::from_secs(60);
const DEFAULT_OBJECT_SIZE: u64 = MEBIBYTE;

/// Workload settings for a benchmark run
#[derive(Debug, Clone)]
pub struct Config {
    bucket: String,
    duration: Duration,
    threads: usize,
    loops: u32,
    object_size: u64,
    multipart_threshold: u64,
    bucket_creation_policy: BucketCreationPolicy,
    clear_bucket: bool,
}

impl Config {
    /// Create a new `Config` builder
    pub fn builder() -> Builder {
        Builder::default()
    }

    /// Bucket the objects are written to
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Maximum wall-clock time of each phase
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Number of concurrent workers per phase
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Number of times the upload, download and delete phases are repeated
    pub fn loops(&self) -> u32 {
        self.loops
    }

    /// Size of every uploaded object in bytes
    pub fn object_size(&self) -> u64 {
        self.object_size
    }

    /// Objects larger than this are sent with multipart upload, in parts of this size
    pub fn multipart_threshold(&self) -> u64 {
        self.multipart_threshold
    }

    /// The upload strategy implied by the object size and multipart threshold
    pub fn upload_strategy(&self) -> UploadStrategy {
        UploadStrategy::select(self.object_size, self.multipart_threshold)
    }

    /// What happens when the bucket can't be created
    pub fn bucket_creation_policy(&self) -> BucketCreationPolicy {
        self.bucket_creation_policy
    }

    /// Whether existing objects are deleted from the bucket before the first loop
    pub fn clear_bucket(&self) -> bool {
        self.clear_bucket
    }
}

/// Fluent style builder for [Config]
#[derive(Debug, Clone)]
pub struct Builder {
    bucket: String,
    duration: Duration,
    threads: usize,
    loops: u32,
    object_size: u64,
    multipart_threshold: u64,
    bucket_creation_policy: BucketCreationPolicy,
    clear_bucket: bool,
}

impl Default for Builder {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_owned(),
            duration: DEFAULT_DURATION,
            threads: 1,
            loops: 1,
            object_size: DEFAULT_OBJECT_SIZE,
            multipart_threshold: MAX_MULTIPART_THRESHOLD,
            bucket_creation_policy: BucketCreationPolicy::default(),
            clear_bucket: true,
        }
    }
}

impl Builder {
    /// Bucket to benchmark against. Default is `loadgen`.
    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = bucket.into();
        self
    }

    /// Maximum duration of each phase. Default is 60 seconds.
    ///
    /// Workers don't start new requests once the duration has elapsed; in-flight requests are
    /// allowed to finish.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Number of concurrent workers per phase. Default is 1.
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    /// Number of benchmark loops. Default is 1.
    pub fn loops(mut self, loops: u32) -> Self {
        self.loops = loops;
        self
    }

    /// Size of each object in bytes. Default is 1 MiB.
    pub fn object_size(mut self, object_size: u64) -> Self {
        self.object_size = object_size;
        self
    }

    /// Objects larger than this are uploaded with multipart, using it as the part size.
    ///
    /// Must be greater than zero and no more than [`MAX_MULTIPART_THRESHOLD`], which is also
    /// the default.
    pub fn multipart_threshold(mut self, threshold: u64) -> Self {
        self.multipart_threshold = threshold;
        self
    }

    /// Set the policy for bucket creation failures. Default is [`BucketCreationPolicy::Fail`].
    pub fn bucket_creation_policy(mut self, policy: BucketCreationPolicy) -> Self {
        self.bucket_creation_policy = policy;
        self
    }

    /// Delete all existing objects in the bucket before running. Default is `true`.
    pub fn clear_bucket(mut self, clear_bucket: bool) -> Self {
        self.clear_bucket = clear_bucket;
        self
    }

    /// Consumes the builder and constructs a validated [`Config`]
    pub fn build(self) -> Result<Config, Error> {
        if self.bucket.is_empty() {
            return Err(error::invalid_input("bucket name must not be empty"));
        }
        if self.threads == 0 {
            return Err(error::invalid_input("thread count must be at least 1"));
        }
        if self.loops == 0 {
            return Err(error::invalid_input("loop count must be at least 1"));
        }
        if self.multipart_threshold == 0 {
            return Err(error::invalid_input(
                "multipart threshold must be greater than zero",
            ));
        }
        if self.multipart_threshold > MAX_MULTIPART_THRESHOLD {
            return Err(error::invalid_input(format!(
                "multipart threshold {} exceeds the maximum of {MAX_MULTIPART_THRESHOLD} bytes",
                self.multipart_threshold
            )));
        }

        Ok(Config {
            bucket: self.bucket,
            duration: self.duration,
            threads: self.threads,
            loops: self.loops,
            object_size: self.object_size,
            multipart_threshold: self.multipart_threshold,
            bucket_creation_policy: self.bucket_creation_policy,
            clear_bucket: self.clear_bucket,
        })
    }
}
