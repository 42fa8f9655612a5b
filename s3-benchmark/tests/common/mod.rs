/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_smithy_async::time::TimeSource;
use bytes::{Bytes, BytesMut};
use s3_benchmark::error::{Error, ErrorKind};
use s3_benchmark::store::{CompletedPartTag, ObjectStore, UploadSession};
use s3_benchmark::types::BucketStatus;

/// A clock that only moves when told to
#[derive(Debug, Clone)]
pub struct ManualTimeSource {
    now: Arc<Mutex<SystemTime>>,
}

impl ManualTimeSource {
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(UNIX_EPOCH + Duration::from_secs(1_700_000_000))),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock().unwrap() += by;
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap()
    }
}

/// Number of calls made to each store operation
#[derive(Debug, Default)]
pub struct CallCounts {
    pub put_object: AtomicUsize,
    pub get_object: AtomicUsize,
    pub delete_object: AtomicUsize,
    pub create_multipart_upload: AtomicUsize,
    pub upload_part: AtomicUsize,
    pub complete_multipart_upload: AtomicUsize,
    pub abort_multipart_upload: AtomicUsize,
    pub create_bucket: AtomicUsize,
    pub list_keys: AtomicUsize,
}

impl CallCounts {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// Calls to the operations driven by the benchmark phases
    pub fn object_calls(&self) -> usize {
        [
            &self.put_object,
            &self.get_object,
            &self.delete_object,
            &self.create_multipart_upload,
            &self.upload_part,
            &self.complete_multipart_upload,
            &self.abort_multipart_upload,
        ]
        .iter()
        .map(|c| c.load(Ordering::SeqCst))
        .sum()
    }
}

#[derive(Debug, Default)]
struct Failures {
    put_object: HashMap<String, usize>,
    get_object: HashMap<String, usize>,
    delete_object: HashMap<String, usize>,
    upload_part: HashMap<i32, usize>,
    complete_multipart_upload: bool,
    create_bucket: bool,
}

fn take_failure<K: std::hash::Hash + Eq>(failures: &mut HashMap<K, usize>, key: &K) -> bool {
    match failures.get_mut(key) {
        Some(remaining) if *remaining > 0 => {
            *remaining -= 1;
            true
        }
        _ => false,
    }
}

fn slow_down() -> Error {
    Error::new(ErrorKind::Throttled, "SlowDown: Please reduce your request rate.")
}

/// In-memory bucket with injectable failures
#[derive(Debug, Default)]
pub struct InMemoryStore {
    objects: Mutex<BTreeMap<String, Bytes>>,
    uploads: Mutex<HashMap<String, BTreeMap<i32, Bytes>>>,
    next_upload_id: AtomicU64,
    failures: Mutex<Failures>,
    calls: CallCounts,
    write_latency: Option<Duration>,
    clock: Option<(ManualTimeSource, Duration)>,
    completed_parts: Mutex<Vec<Vec<CompletedPartTag>>>,
    part_sizes: Mutex<Vec<(i32, usize)>>,
    deleted: Mutex<Vec<String>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long in every `put_object` and `upload_part`
    pub fn with_write_latency(mut self, latency: Duration) -> Self {
        self.write_latency = Some(latency);
        self
    }

    /// Advance `clock` by `step` on every call
    pub fn with_clock(mut self, clock: ManualTimeSource, step: Duration) -> Self {
        self.clock = Some((clock, step));
        self
    }

    pub fn with_object(self, key: &str, data: &'static [u8]) -> Self {
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_owned(), Bytes::from_static(data));
        self
    }

    pub fn fail_put(self, key: &str, times: usize) -> Self {
        self.failures
            .lock()
            .unwrap()
            .put_object
            .insert(key.to_owned(), times);
        self
    }

    pub fn fail_get(self, key: &str, times: usize) -> Self {
        self.failures
            .lock()
            .unwrap()
            .get_object
            .insert(key.to_owned(), times);
        self
    }

    pub fn fail_delete(self, key: &str, times: usize) -> Self {
        self.failures
            .lock()
            .unwrap()
            .delete_object
            .insert(key.to_owned(), times);
        self
    }

    pub fn fail_part(self, part_number: i32, times: usize) -> Self {
        self.failures
            .lock()
            .unwrap()
            .upload_part
            .insert(part_number, times);
        self
    }

    pub fn fail_complete(self) -> Self {
        self.failures.lock().unwrap().complete_multipart_upload = true;
        self
    }

    pub fn fail_create_bucket(self) -> Self {
        self.failures.lock().unwrap().create_bucket = true;
        self
    }

    pub fn calls(&self) -> &CallCounts {
        &self.calls
    }

    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    /// Part lists passed to every successful completion
    pub fn completed_parts(&self) -> Vec<Vec<CompletedPartTag>> {
        self.completed_parts.lock().unwrap().clone()
    }

    /// (part number, size) of every accepted part in arrival order
    pub fn part_sizes(&self) -> Vec<(i32, usize)> {
        self.part_sizes.lock().unwrap().clone()
    }

    /// Keys successfully deleted in order
    pub fn deleted(&self) -> Vec<String> {
        self.deleted.lock().unwrap().clone()
    }

    /// Multipart uploads neither completed nor aborted
    pub fn open_uploads(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    fn tick(&self, counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
        if let Some((clock, step)) = &self.clock {
            clock.advance(*step);
        }
    }

    async fn write_delay(&self) {
        if let Some(latency) = self.write_latency {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn put_object(&self, key: &str, body: Bytes) -> Result<(), Error> {
        self.tick(&self.calls.put_object);
        self.write_delay().await;
        if take_failure(&mut self.failures.lock().unwrap().put_object, &key.to_owned()) {
            return Err(slow_down());
        }
        self.objects.lock().unwrap().insert(key.to_owned(), body);
        Ok(())
    }

    async fn get_object(&self, key: &str) -> Result<ByteStream, Error> {
        self.tick(&self.calls.get_object);
        if take_failure(&mut self.failures.lock().unwrap().get_object, &key.to_owned()) {
            return Err(slow_down());
        }
        match self.object(key) {
            Some(data) => Ok(ByteStream::from(data)),
            None => Err(Error::new(ErrorKind::NotFound, format!("NoSuchKey: {key}"))),
        }
    }

    async fn delete_object(&self, key: &str) -> Result<(), Error> {
        self.tick(&self.calls.delete_object);
        if take_failure(
            &mut self.failures.lock().unwrap().delete_object,
            &key.to_owned(),
        ) {
            return Err(slow_down());
        }
        self.objects.lock().unwrap().remove(key);
        self.deleted.lock().unwrap().push(key.to_owned());
        Ok(())
    }

    async fn create_multipart_upload(&self, key: &str) -> Result<UploadSession, Error> {
        self.tick(&self.calls.create_multipart_upload);
        let upload_id = format!(
            "upload-{}",
            self.next_upload_id.fetch_add(1, Ordering::SeqCst)
        );
        self.uploads
            .lock()
            .unwrap()
            .insert(upload_id.clone(), BTreeMap::new());
        Ok(UploadSession::new(key, upload_id))
    }

    async fn upload_part(
        &self,
        session: &UploadSession,
        part_number: i32,
        body: Bytes,
    ) -> Result<CompletedPartTag, Error> {
        self.tick(&self.calls.upload_part);
        self.write_delay().await;
        if take_failure(&mut self.failures.lock().unwrap().upload_part, &part_number) {
            return Err(slow_down());
        }

        let mut uploads = self.uploads.lock().unwrap();
        let parts = uploads
            .get_mut(session.upload_id())
            .ok_or_else(|| Error::new(ErrorKind::NotFound, "NoSuchUpload"))?;
        self.part_sizes
            .lock()
            .unwrap()
            .push((part_number, body.len()));
        parts.insert(part_number, body);
        Ok(CompletedPartTag::new(
            part_number,
            Some(format!("etag-{part_number}")),
        ))
    }

    async fn complete_multipart_upload(
        &self,
        session: &UploadSession,
        parts: &[CompletedPartTag],
    ) -> Result<(), Error> {
        self.tick(&self.calls.complete_multipart_upload);
        if self.failures.lock().unwrap().complete_multipart_upload {
            return Err(Error::new(ErrorKind::RequestFailed, "InternalError"));
        }

        let uploaded = self
            .uploads
            .lock()
            .unwrap()
            .remove(session.upload_id())
            .ok_or_else(|| Error::new(ErrorKind::NotFound, "NoSuchUpload"))?;
        let mut object = BytesMut::new();
        for part in parts {
            let data = uploaded
                .get(&part.part_number())
                .ok_or_else(|| Error::new(ErrorKind::RequestFailed, "InvalidPart"))?;
            object.extend_from_slice(data);
        }

        self.completed_parts.lock().unwrap().push(parts.to_vec());
        self.objects
            .lock()
            .unwrap()
            .insert(session.key().to_owned(), object.freeze());
        Ok(())
    }

    async fn abort_multipart_upload(&self, session: &UploadSession) -> Result<(), Error> {
        self.tick(&self.calls.abort_multipart_upload);
        self.uploads.lock().unwrap().remove(session.upload_id());
        Ok(())
    }

    async fn create_bucket(&self) -> Result<BucketStatus, Error> {
        self.tick(&self.calls.create_bucket);
        if self.failures.lock().unwrap().create_bucket {
            return Err(Error::new(ErrorKind::BucketUnavailable, "AccessDenied"));
        }
        Ok(BucketStatus::Created)
    }

    async fn list_keys(&self) -> Result<Vec<String>, Error> {
        self.tick(&self.calls.list_keys);
        Ok(self.keys())
    }
}
