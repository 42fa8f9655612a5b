/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;

use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_smithy_runtime_api::client::orchestrator::HttpResponse;

/// A boxed error that is `Send` and `Sync`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors returned by this library
///
/// NOTE: Use [`aws_smithy_types::error::display::DisplayErrorContext`] or similar to display
/// the entire error cause/source chain.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    source: BoxError,
}

/// General categories of benchmark errors.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Configuration or argument validation issues
    InputInvalid,

    /// The object store asked the client to slow down (e.g. `SlowDown`, HTTP 503)
    Throttled,

    /// A request against the object store failed for any other reason
    RequestFailed,

    /// Resource not found (e.g. bucket, key, multipart upload ID not found)
    NotFound,

    /// Some kind of internal runtime issue (e.g. task failure, poisoned mutex, etc)
    RuntimeError,

    /// The target bucket could not be created or prepared for the run
    BucketUnavailable,

    /// A multipart upload was aborted after one of its steps failed
    UploadAborted,

    /// The run window closed before the operation could finish
    OperationCancelled,
}

impl Error {
    /// Creates a new benchmark [`Error`] from a known kind of error as well as an arbitrary error
    /// source.
    pub fn new<E>(kind: ErrorKind, err: E) -> Error
    where
        E: Into<BoxError>,
    {
        Error {
            kind,
            source: err.into(),
        }
    }

    /// Returns the corresponding [`ErrorKind`] for this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns true if the object store rejected the request to reduce the request rate.
    pub fn is_throttling(&self) -> bool {
        self.kind == ErrorKind::Throttled
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::InputInvalid => write!(f, "invalid input"),
            ErrorKind::Throttled => write!(f, "request throttled"),
            ErrorKind::RequestFailed => write!(f, "request failed"),
            ErrorKind::NotFound => write!(f, "resource not found"),
            ErrorKind::RuntimeError => write!(f, "runtime error"),
            ErrorKind::BucketUnavailable => write!(f, "bucket unavailable"),
            ErrorKind::UploadAborted => write!(f, "multipart upload aborted"),
            ErrorKind::OperationCancelled => write!(f, "operation cancelled"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::new(ErrorKind::RuntimeError, value)
    }
}

impl<T> From<std::sync::PoisonError<T>> for Error
where
    T: Send + Sync + 'static,
{
    fn from(value: std::sync::PoisonError<T>) -> Self {
        Self::new(ErrorKind::RuntimeError, value)
    }
}

impl From<aws_smithy_types::error::operation::BuildError> for Error {
    fn from(value: aws_smithy_types::error::operation::BuildError) -> Self {
        Self::new(ErrorKind::InputInvalid, value)
    }
}

impl From<aws_smithy_types::byte_stream::error::Error> for Error {
    fn from(value: aws_smithy_types::byte_stream::error::Error) -> Self {
        Self::new(ErrorKind::RequestFailed, value)
    }
}

pub(crate) fn invalid_input<E>(err: E) -> Error
where
    E: Into<BoxError>,
{
    Error::new(ErrorKind::InputInvalid, err)
}

pub(crate) fn upload_aborted<E>(err: E) -> Error
where
    E: Into<BoxError>,
{
    Error::new(ErrorKind::UploadAborted, err)
}

pub(crate) fn operation_cancelled<E>(err: E) -> Error
where
    E: Into<BoxError>,
{
    Error::new(ErrorKind::OperationCancelled, err)
}

pub(crate) fn from_kind<E>(kind: ErrorKind) -> impl FnOnce(E) -> Error
where
    E: Into<BoxError>,
{
    |err| Error::new(kind, err)
}

const THROTTLING_CODES: &[&str] = &[
    "SlowDown",
    "ServiceUnavailable",
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "TooManyRequests",
];

const NOT_FOUND_CODES: &[&str] = &["NotFound", "NoSuchKey", "NoSuchUpload", "NoSuchBucket"];

/// Classify a failed request by its error code, falling back to the HTTP status.
fn classify(code: Option<&str>, status: Option<u16>) -> ErrorKind {
    match code {
        Some(code) if THROTTLING_CODES.contains(&code) => ErrorKind::Throttled,
        Some(code) if NOT_FOUND_CODES.contains(&code) => ErrorKind::NotFound,
        _ => match status {
            Some(503 | 429) => ErrorKind::Throttled,
            Some(404) => ErrorKind::NotFound,
            _ => ErrorKind::RequestFailed,
        },
    }
}

impl<E> From<SdkError<E, HttpResponse>> for Error
where
    E: std::error::Error + ProvideErrorMetadata + Send + Sync + 'static,
{
    fn from(value: SdkError<E, HttpResponse>) -> Self {
        let status = value.raw_response().map(|resp| resp.status().as_u16());
        let kind = classify(value.code(), status);
        Error::new(kind, value)
    }
}

#[cfg(test)]
mod tests {
    use super::{classify, ErrorKind};

    #[test]
    fn test_classify_by_code() {
        assert_eq!(ErrorKind::Throttled, classify(Some("SlowDown"), Some(503)));
        assert_eq!(ErrorKind::Throttled, classify(Some("ThrottlingException"), Some(400)));
        assert_eq!(ErrorKind::NotFound, classify(Some("NoSuchKey"), Some(404)));
        assert_eq!(ErrorKind::RequestFailed, classify(Some("AccessDenied"), Some(403)));
    }

    #[test]
    fn test_classify_by_status() {
        assert_eq!(ErrorKind::Throttled, classify(None, Some(503)));
        assert_eq!(ErrorKind::Throttled, classify(None, Some(429)));
        assert_eq!(ErrorKind::NotFound, classify(None, Some(404)));
        assert_eq!(ErrorKind::RequestFailed, classify(None, Some(500)));
        assert_eq!(ErrorKind::RequestFailed, classify(None, None));
    }
}
