/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketLocationConstraint, CompletedMultipartUpload, CompletedPart, CreateBucketConfiguration,
};
use bytes::Bytes;
use tracing::Instrument;

use crate::error::{self, Error, ErrorKind};
use crate::store::{CompletedPartTag, ObjectStore, UploadSession};
use crate::types::BucketStatus;

const CONTENT_TYPE: &str = "application/octet-stream";

// buckets in the default region are created without a location constraint
const DEFAULT_REGION: &str = "us-east-1";

/// S3 implementation of [`ObjectStore`] for a single bucket
#[derive(Debug, Clone)]
pub struct S3Store {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3Store {
    /// Create a store for `bucket` using the given client
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// The bucket every request targets
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The underlying S3 client
    pub fn client(&self) -> &aws_sdk_s3::Client {
        &self.client
    }

    fn location_constraint(&self) -> Option<CreateBucketConfiguration> {
        let region = self.client.config().region()?.as_ref();
        if region == DEFAULT_REGION {
            return None;
        }
        Some(
            CreateBucketConfiguration::builder()
                .location_constraint(BucketLocationConstraint::from(region))
                .build(),
        )
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(&self, key: &str, body: Bytes) -> Result<(), Error> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type(CONTENT_TYPE)
            .content_length(body.len() as i64)
            .body(ByteStream::from(body))
            .send()
            .instrument(tracing::debug_span!("send-put-object"))
            .await?;
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<ByteStream, Error> {
        let resp = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .instrument(tracing::debug_span!("send-get-object"))
            .await?;
        Ok(resp.body)
    }

    async fn delete_object(&self, key: &str) -> Result<(), Error> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .instrument(tracing::debug_span!("send-delete-object"))
            .await?;
        Ok(())
    }

    async fn create_multipart_upload(&self, key: &str) -> Result<UploadSession, Error> {
        let resp = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .content_type(CONTENT_TYPE)
            .send()
            .instrument(tracing::debug_span!("send-create-multipart-upload"))
            .await?;

        let upload_id = resp.upload_id.ok_or_else(|| {
            Error::new(
                ErrorKind::RequestFailed,
                "CreateMultipartUpload response is missing the upload id",
            )
        })?;
        Ok(UploadSession::new(key, upload_id))
    }

    async fn upload_part(
        &self,
        session: &UploadSession,
        part_number: i32,
        body: Bytes,
    ) -> Result<CompletedPartTag, Error> {
        let resp = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(session.key())
            .upload_id(session.upload_id())
            .part_number(part_number)
            .content_length(body.len() as i64)
            .body(ByteStream::from(body))
            .send()
            .instrument(tracing::debug_span!("send-upload-part", part_number))
            .await?;

        tracing::trace!("completed upload of part number {}", part_number);
        Ok(CompletedPartTag::new(part_number, resp.e_tag))
    }

    async fn complete_multipart_upload(
        &self,
        session: &UploadSession,
        parts: &[CompletedPartTag],
    ) -> Result<(), Error> {
        let parts = parts
            .iter()
            .map(|p| {
                CompletedPart::builder()
                    .part_number(p.part_number())
                    .set_e_tag(p.e_tag().map(str::to_owned))
                    .build()
            })
            .collect();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(session.key())
            .upload_id(session.upload_id())
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .instrument(tracing::debug_span!("send-complete-multipart-upload"))
            .await?;
        Ok(())
    }

    async fn abort_multipart_upload(&self, session: &UploadSession) -> Result<(), Error> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(session.key())
            .upload_id(session.upload_id())
            .send()
            .instrument(tracing::debug_span!("send-abort-multipart-upload"))
            .await?;
        Ok(())
    }

    async fn create_bucket(&self) -> Result<BucketStatus, Error> {
        let result = self
            .client
            .create_bucket()
            .bucket(&self.bucket)
            .set_create_bucket_configuration(self.location_constraint())
            .send()
            .instrument(tracing::debug_span!("send-create-bucket"))
            .await;

        match result {
            Ok(_) => Ok(BucketStatus::Created),
            Err(err)
                if err.as_service_error().is_some_and(|e| {
                    e.is_bucket_already_owned_by_you() || e.is_bucket_already_exists()
                }) =>
            {
                Ok(BucketStatus::AlreadyExists)
            }
            Err(err) => Err(error::from_kind(ErrorKind::BucketUnavailable)(err)),
        }
    }

    async fn list_keys(&self) -> Result<Vec<String>, Error> {
        let mut keys = Vec::new();
        let mut continuation_token = None;
        loop {
            let resp = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_continuation_token(continuation_token.take())
                .send()
                .instrument(tracing::debug_span!("send-list-objects-v2"))
                .await?;

            keys.extend(
                resp.contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(str::to_owned)),
            );

            match resp.next_continuation_token() {
                Some(token) if resp.is_truncated().unwrap_or_default() => {
                    continuation_token = Some(token.to_owned());
                }
                _ => break,
            }
        }
        Ok(keys)
    }
}
