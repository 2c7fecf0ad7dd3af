//! Ordered, range-queryable key indexes.
//!
//! Two variants implement [`Paginated`]:
//! - [`SimplePaginated`]: append-only list; duplicates are kept and `has` scans.
//! - [`MappedPaginated`]: deduplicating list backed by an auxiliary set for O(1) `has`.
//!
//! `get` never consumes anything, so a page can be requested any number of
//! times.

use crate::error::{Result, StateError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::Hash;

/// Default page size used when a request does not specify one.
pub const DEFAULT_PAGE_SIZE: u64 = 20;

/// Requested page of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginatedInput {
    /// Index of the first key to return.
    #[serde(default)]
    pub start_index: u64,
    /// Maximum number of keys to return.
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

fn default_page_size() -> u64 {
    DEFAULT_PAGE_SIZE
}

impl Default for PaginatedInput {
    fn default() -> Self {
        Self {
            start_index: 0,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PaginatedInput {
    /// Creates a page request.
    pub fn new(start_index: u64, page_size: u64) -> Self {
        Self {
            start_index,
            page_size,
        }
    }

    /// Requests every key.
    pub fn all() -> Self {
        Self::new(0, u64::MAX)
    }
}

/// A page of keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginatedOutput<K> {
    /// Index of the first returned key.
    pub start_index: u64,
    /// Length of the whole index.
    pub total: u64,
    /// Returned keys.
    pub data: Vec<K>,
}

/// Ordered index over opaque keys.
pub trait Paginated<K> {
    /// Appends a key to the end of the index.
    fn append(&mut self, key: K);

    /// Returns true if `key` is in the index.
    fn has(&self, key: &K) -> bool;

    /// Removes every occurrence of `key`. Returns true if anything was removed.
    fn remove(&mut self, key: &K) -> bool;

    /// Returns all keys in order.
    fn keys(&self) -> &[K];

    /// Returns the number of keys.
    fn len(&self) -> usize {
        self.keys().len()
    }

    /// Returns true if the index holds no keys.
    fn is_empty(&self) -> bool {
        self.keys().is_empty()
    }

    /// Returns keys `[start_index, start_index + page_size)`, clipped to the
    /// index length.
    ///
    /// Fails with `OutOfRange` only if `start_index` exceeds the length.
    fn get(&self, input: &PaginatedInput) -> Result<PaginatedOutput<K>>
    where
        K: Clone,
    {
        let keys = self.keys();
        let len = keys.len() as u64;
        if input.start_index > len {
            return Err(StateError::OutOfRange {
                start: input.start_index,
                len,
            });
        }
        let end = input.start_index.saturating_add(input.page_size).min(len);
        Ok(PaginatedOutput {
            start_index: input.start_index,
            total: len,
            data: keys[input.start_index as usize..end as usize].to_vec(),
        })
    }
}

/// Append-only index that keeps duplicate keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimplePaginated<K> {
    keys: Vec<K>,
}

impl<K> Default for SimplePaginated<K> {
    fn default() -> Self {
        Self { keys: Vec::new() }
    }
}

impl<K> SimplePaginated<K> {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<K: PartialEq> Paginated<K> for SimplePaginated<K> {
    fn append(&mut self, key: K) {
        self.keys.push(key);
    }

    fn has(&self, key: &K) -> bool {
        self.keys.contains(key)
    }

    fn remove(&mut self, key: &K) -> bool {
        let before = self.keys.len();
        self.keys.retain(|k| k != key);
        self.keys.len() != before
    }

    fn keys(&self) -> &[K] {
        &self.keys
    }
}

/// Deduplicating index with O(1) existence checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedPaginated<K: Eq + Hash> {
    keys: Vec<K>,
    set: HashSet<K>,
}

impl<K: Eq + Hash> Default for MappedPaginated<K> {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            set: HashSet::new(),
        }
    }
}

impl<K: Eq + Hash> MappedPaginated<K> {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<K: Eq + Hash + Clone> Paginated<K> for MappedPaginated<K> {
    fn append(&mut self, key: K) {
        if self.set.insert(key.clone()) {
            self.keys.push(key);
        }
    }

    fn has(&self, key: &K) -> bool {
        self.set.contains(key)
    }

    fn remove(&mut self, key: &K) -> bool {
        if !self.set.remove(key) {
            return false;
        }
        self.keys.retain(|k| k != key);
        true
    }

    fn keys(&self) -> &[K] {
        &self.keys
    }
}
