/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::sync::Arc;

use aws_sdk_s3::error::DisplayErrorContext;
use futures_util::future;
use tower::{service_fn, Service, ServiceBuilder, ServiceExt};

use crate::error::{self, Error};
use crate::operation::upload::UploadContext;
use crate::payload::PartData;
use crate::phase::RunWindow;
use crate::store::{CompletedPartTag, ObjectStore, UploadSession};
use crate::types::ObjectKey;

/// Attempts made for each part, including the first one
pub const MAX_PART_ATTEMPTS: usize = 3;

/// An open multipart upload and the parts accepted so far
#[derive(Debug)]
struct MultipartUpload {
    session: UploadSession,
    completed_parts: Vec<CompletedPartTag>,
    remaining: u64,
}

impl MultipartUpload {
    fn new(session: UploadSession, content_length: u64) -> Self {
        Self {
            session,
            completed_parts: Vec::new(),
            remaining: content_length,
        }
    }

    fn record(&mut self, part: CompletedPartTag, len: u64) {
        self.remaining = self.remaining.saturating_sub(len);
        tracing::trace!(
            "part {} accepted, {} bytes remaining",
            part.part_number(),
            self.remaining
        );
        self.completed_parts.push(part);
    }

    /// The session with its parts ordered by part number as required for completion
    fn ordered_parts(&mut self) -> (&UploadSession, &[CompletedPartTag]) {
        self.completed_parts.sort_by_key(|p| p.part_number());
        (&self.session, &self.completed_parts)
    }
}

/// Request/input type for our "upload_part" service.
#[derive(Debug, Clone)]
struct UploadPartRequest {
    store: Arc<dyn ObjectStore>,
    session: UploadSession,
    part: PartData,
    window: RunWindow,
}

/// handler (service fn) for a single part
async fn upload_part_handler(request: UploadPartRequest) -> Result<CompletedPartTag, Error> {
    request
        .store
        .upload_part(
            &request.session,
            request.part.part_number(),
            request.part.data().clone(),
        )
        .await
}

/// Retries a failed part until it has been attempted [`MAX_PART_ATTEMPTS`] times or the
/// run window closes
#[derive(Debug, Clone)]
struct PartRetryPolicy {
    remaining_attempts: usize,
}

impl Default for PartRetryPolicy {
    fn default() -> Self {
        Self {
            remaining_attempts: MAX_PART_ATTEMPTS - 1,
        }
    }
}

impl tower::retry::Policy<UploadPartRequest, CompletedPartTag, Error> for PartRetryPolicy {
    type Future = future::Ready<()>;

    fn retry(
        &mut self,
        req: &mut UploadPartRequest,
        result: &mut Result<CompletedPartTag, Error>,
    ) -> Option<Self::Future> {
        let err = result.as_ref().err()?;
        if self.remaining_attempts == 0 {
            return None;
        }
        if !req.window.is_open() {
            tracing::debug!(
                "not retrying part {}, run window closed",
                req.part.part_number()
            );
            return None;
        }
        self.remaining_attempts -= 1;
        tracing::debug!(
            "retrying part {} ({} attempts left): {}",
            req.part.part_number(),
            self.remaining_attempts + 1,
            DisplayErrorContext(err)
        );
        Some(future::ready(()))
    }

    fn clone_request(&mut self, req: &UploadPartRequest) -> Option<UploadPartRequest> {
        Some(req.clone())
    }
}

/// Create a new tower::Service for uploading individual parts with bounded retry
fn upload_part_service() -> impl Service<
    UploadPartRequest,
    Response = CompletedPartTag,
    Error = Error,
    Future: Send,
> + Clone
       + Send {
    ServiceBuilder::new()
        .retry(PartRetryPolicy::default())
        .service(service_fn(upload_part_handler))
}

async fn abort_upload(store: &dyn ObjectStore, session: &UploadSession) {
    if let Err(err) = store.abort_multipart_upload(session).await {
        tracing::error!(
            "failed to abort multipart upload {}: {}",
            session.upload_id(),
            DisplayErrorContext(&err)
        );
    }
}

/// Upload the payload as `key` in parts of `part_size` bytes.
///
/// A part that still fails after [`MAX_PART_ATTEMPTS`] attempts, or a failed completion,
/// aborts the upload before the error is returned. When the run window closes before the
/// next part is sent the upload is aborted with [`ErrorKind::OperationCancelled`].
///
/// [`ErrorKind::OperationCancelled`]: crate::error::ErrorKind::OperationCancelled
pub(super) async fn upload(
    ctx: &UploadContext,
    key: &ObjectKey,
    part_size: u64,
) -> Result<(), Error> {
    let store = ctx.store();
    let payload = ctx.state().payload();
    let window = ctx.state().window();

    let session = store.create_multipart_upload(key.as_str()).await?;
    tracing::trace!(
        "multipart upload of {key} started with upload id {}",
        session.upload_id()
    );
    let mut upload = MultipartUpload::new(session, payload.len());

    let svc = upload_part_service();
    for part in payload.parts(part_size) {
        let part_number = part.part_number();
        if !window.is_open() {
            tracing::debug!("run window closed before part {part_number} of {key}, aborting upload");
            abort_upload(store.as_ref(), &upload.session).await;
            return Err(error::operation_cancelled(format!(
                "run window closed before part {part_number} of {key} was sent"
            )));
        }

        let len = part.len();
        let request = UploadPartRequest {
            store: store.clone(),
            session: upload.session.clone(),
            part,
            window: window.clone(),
        };

        match svc.clone().oneshot(request).await {
            Ok(completed) => upload.record(completed, len),
            Err(err) => {
                tracing::warn!("part {part_number} of {key} failed, aborting upload");
                abort_upload(store.as_ref(), &upload.session).await;
                return Err(error::upload_aborted(err));
            }
        }
    }

    let (session, parts) = upload.ordered_parts();
    let completed = store.complete_multipart_upload(session, parts).await;
    if let Err(err) = completed {
        tracing::warn!("completing multipart upload of {key} failed, aborting upload");
        abort_upload(store.as_ref(), &upload.session).await;
        return Err(error::upload_aborted(err));
    }

    tracing::trace!("multipart upload of {key} completed");
    Ok(())
}
