/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;

use crate::error::Error;
use crate::types::BucketStatus;

/// [`ObjectStore`] backed by Amazon S3 or any S3 compatible service
pub mod s3;

pub use s3::S3Store;

/// Handle to a multipart upload started with [`ObjectStore::create_multipart_upload`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSession {
    key: String,
    upload_id: String,
}

impl UploadSession {
    /// Create a handle for an upload id returned by the store
    pub fn new(key: impl Into<String>, upload_id: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            upload_id: upload_id.into(),
        }
    }

    /// Key of the object being uploaded
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Upload id assigned by the store
    pub fn upload_id(&self) -> &str {
        &self.upload_id
    }
}

/// A part accepted by the store, needed to complete the upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedPartTag {
    part_number: i32,
    e_tag: Option<String>,
}

impl CompletedPartTag {
    /// Create a part tag
    pub fn new(part_number: i32, e_tag: Option<String>) -> Self {
        Self { part_number, e_tag }
    }

    /// The 1-based part number
    pub fn part_number(&self) -> i32 {
        self.part_number
    }

    /// ETag returned for the part
    pub fn e_tag(&self) -> Option<&str> {
        self.e_tag.as_deref()
    }
}

/// Operations the benchmark drives against an object store.
///
/// Every operation targets the bucket the store was created for. Errors are classified through
/// [`ErrorKind`](crate::error::ErrorKind), throttling as
/// [`ErrorKind::Throttled`](crate::error::ErrorKind::Throttled).
#[async_trait]
pub trait ObjectStore: Send + Sync + fmt::Debug {
    /// Upload `body` as a single object
    async fn put_object(&self, key: &str, body: Bytes) -> Result<(), Error>;

    /// Start downloading an object, returning its body stream
    async fn get_object(&self, key: &str) -> Result<ByteStream, Error>;

    /// Delete an object
    async fn delete_object(&self, key: &str) -> Result<(), Error>;

    /// Start a multipart upload
    async fn create_multipart_upload(&self, key: &str) -> Result<UploadSession, Error>;

    /// Upload one part of a multipart upload. Safe to retry.
    async fn upload_part(
        &self,
        session: &UploadSession,
        part_number: i32,
        body: Bytes,
    ) -> Result<CompletedPartTag, Error>;

    /// Assemble the object from the given parts, which must be in ascending part number order
    async fn complete_multipart_upload(
        &self,
        session: &UploadSession,
        parts: &[CompletedPartTag],
    ) -> Result<(), Error>;

    /// Discard a multipart upload and any parts uploaded so far
    async fn abort_multipart_upload(&self, session: &UploadSession) -> Result<(), Error>;

    /// Create the bucket
    async fn create_bucket(&self) -> Result<BucketStatus, Error>;

    /// List every key in the bucket
    async fn list_keys(&self) -> Result<Vec<String>, Error>;
}
