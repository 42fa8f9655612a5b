/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use bytes::Bytes;

/// Random object body shared by every upload of a run.
///
/// Cloning a `Payload` or any of its parts is reference counted and never copies the data.
#[derive(Debug, Clone)]
pub struct Payload {
    data: Bytes,
}

impl Payload {
    /// Generate `size` bytes of random data.
    pub fn random(size: u64) -> Self {
        let mut data = vec![0u8; size as usize];
        fastrand::fill(&mut data);
        Self { data: data.into() }
    }

    /// Number of bytes in the payload
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    /// Returns true if the payload has no data
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The whole payload
    pub fn bytes(&self) -> Bytes {
        self.data.clone()
    }

    /// Split the payload into sequential parts of `part_size` bytes.
    ///
    /// All parts but the last are exactly `part_size` long, the last part carries the remainder.
    /// Part numbers start at 1. An empty payload yields no parts.
    pub fn parts(&self, part_size: u64) -> Parts {
        Parts {
            data: self.data.clone(),
            part_size: part_size.max(1) as usize,
            next_part_number: 1,
        }
    }
}

impl From<Bytes> for Payload {
    fn from(data: Bytes) -> Self {
        Self { data }
    }
}

/// A numbered slice of the payload sent with `UploadPart`
#[derive(Debug, Clone)]
pub struct PartData {
    part_number: i32,
    data: Bytes,
}

impl PartData {
    /// The 1-based part number
    pub fn part_number(&self) -> i32 {
        self.part_number
    }

    /// The part body
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Length of the part in bytes
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    /// Returns true if the part has no data
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Iterator over the parts of a [`Payload`], see [`Payload::parts`]
#[derive(Debug)]
pub struct Parts {
    data: Bytes,
    part_size: usize,
    next_part_number: i32,
}

impl Iterator for Parts {
    type Item = PartData;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }
        let len = self.part_size.min(self.data.len());
        let part = PartData {
            part_number: self.next_part_number,
            data: self.data.split_to(len),
        };
        self.next_part_number += 1;
        Some(part)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.data.len().div_ceil(self.part_size);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Parts {}
