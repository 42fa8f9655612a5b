/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::hash_map::RandomState;
use std::collections::HashSet;
use std::hash::BuildHasher;
use std::sync::{Arc, Mutex, PoisonError};

use crate::types::ObjectKey;

const DEFAULT_STRIPES: usize = 64;

/// Set of keys confirmed by the upload phase.
///
/// Inserts take a lock on one of several stripes picked by key hash, so concurrent upload
/// workers rarely contend. Once the upload phase is over the set is frozen with
/// [`snapshot`](KeyRegistry::snapshot) and read without any locking.
#[derive(Debug)]
pub struct KeyRegistry {
    stripes: Box<[Mutex<HashSet<ObjectKey>>]>,
    hasher: RandomState,
}

impl Default for KeyRegistry {
    fn default() -> Self {
        Self::with_stripes(DEFAULT_STRIPES)
    }
}

impl KeyRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry with the given number of lock stripes (at least one)
    pub fn with_stripes(stripes: usize) -> Self {
        let stripes = (0..stripes.max(1))
            .map(|_| Mutex::new(HashSet::new()))
            .collect();
        Self {
            stripes,
            hasher: RandomState::new(),
        }
    }

    fn stripe(&self, key: &ObjectKey) -> &Mutex<HashSet<ObjectKey>> {
        let idx = self.hasher.hash_one(key) as usize % self.stripes.len();
        &self.stripes[idx]
    }

    /// Record a key whose upload completed. Returns false if the key was already present.
    pub fn insert(&self, key: ObjectKey) -> bool {
        // a panicking holder can't leave a HashSet half-inserted, so poison is ignored
        self.stripe(&key)
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key)
    }

    /// Returns true if the key has been recorded
    pub fn contains(&self, key: &ObjectKey) -> bool {
        self.stripe(key)
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    /// Number of recorded keys
    pub fn len(&self) -> usize {
        self.stripes
            .iter()
            .map(|s| s.lock().unwrap_or_else(PoisonError::into_inner).len())
            .sum()
    }

    /// Returns true if no key has been recorded
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Freeze the current contents into an immutable, cheaply cloneable key list.
    pub fn snapshot(&self) -> FrozenKeys {
        let mut keys = Vec::with_capacity(self.len());
        for stripe in self.stripes.iter() {
            let stripe = stripe.lock().unwrap_or_else(PoisonError::into_inner);
            keys.extend(stripe.iter().cloned());
        }
        FrozenKeys { keys: keys.into() }
    }
}

/// Read-only view of a [`KeyRegistry`] handed to the download phase
#[derive(Debug, Clone, Default)]
pub struct FrozenKeys {
    keys: Arc<[ObjectKey]>,
}

impl FrozenKeys {
    /// Number of keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if there are no keys
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// The key at `idx` wrapping around the end, `None` when empty
    pub fn get_wrapping(&self, idx: usize) -> Option<&ObjectKey> {
        if self.keys.is_empty() {
            return None;
        }
        self.keys.get(idx % self.keys.len())
    }

    /// Iterate over all keys
    pub fn iter(&self) -> impl Iterator<Item = &ObjectKey> {
        self.keys.iter()
    }
}

impl FromIterator<ObjectKey> for FrozenKeys {
    fn from_iter<T: IntoIterator<Item = ObjectKey>>(iter: T) -> Self {
        Self {
            keys: iter.into_iter().collect(),
        }
    }
}
