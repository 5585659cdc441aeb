//! Write-back cache in front of an object store.
//!
//! The cache serves reads and writes from memory and only reaches the
//! backing store when it has to:
//! - `create` goes to the backing store to obtain a handle, so the handle
//!   space is always owned by the backing store
//! - `update` only touches memory (write-back, not write-through), unless it
//!   has to make room for a handle that is not cached
//! - `load` falls through to the backing store on a miss
//!
//! # Eviction
//!
//! When a `create`, or an `update` of a handle that is not cached, finds the
//! cache at capacity, every cached entry is written back with `update` and the
//! whole map is cleared before the new entry goes in. This is a full flush,
//! not per-entry LRU.
//!
//! An `update` of a handle the backing store never issued is accepted here and
//! rejected by the backing store at the next flush, which then drops it.
//!
//! # Durability
//!
//! Anything held only in the cache is lost if the cache is dropped without a
//! `flush`. Use `into_inner` to flush and recover the backing store.

use std::collections::HashMap;

use crate::storage::io::{Handle, Storage, StorageError};

/// Default cache capacity in entries.
pub const DEFAULT_CACHE_CAPACITY: usize = 8192;

/// A bounded write-back cache wrapping a `Storage`.
///
/// # Invariants
/// - `entries.len() <= capacity`
/// - every cached handle was handed out by the backing store or passed to `update`
pub struct WriteBackCache<T, S> {
    backing: S,
    /// Latest in-memory version of each cached object.
    entries: HashMap<Handle, T>,
    capacity: usize,
}

impl<T, S: std::fmt::Debug> std::fmt::Debug for WriteBackCache<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WriteBackCache")
            .field("backing", &self.backing)
            .field("cached", &self.entries.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl<T: Clone, S: Storage<T>> WriteBackCache<T, S> {
    /// Create a cache with the default capacity.
    #[must_use]
    pub fn new(backing: S) -> Self {
        Self {
            backing,
            entries: HashMap::new(),
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    /// Create a cache holding at most `capacity` entries.
    ///
    /// Returns an error if `capacity` is 0.
    pub fn with_capacity(backing: S, capacity: usize) -> Result<Self, StorageError> {
        if capacity == 0 {
            return Err(StorageError::ZeroCapacity);
        }
        Ok(Self {
            backing,
            entries: HashMap::with_capacity(capacity.min(DEFAULT_CACHE_CAPACITY)),
            capacity,
        })
    }

    /// Whether the object behind `handle` is currently held in memory.
    #[must_use]
    pub fn is_cached(&self, handle: Handle) -> bool {
        self.entries.contains_key(&handle)
    }

    /// Number of cached entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of cached entries.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get a reference to the backing store.
    #[must_use]
    pub const fn backing(&self) -> &S {
        &self.backing
    }

    /// Get mutable access to the backing store.
    ///
    /// Writing through this bypasses the cache; cached versions still win on
    /// the next flush.
    pub const fn backing_mut(&mut self) -> &mut S {
        &mut self.backing
    }

    /// Write every cached entry back to the backing store.
    ///
    /// Entries stay cached. On failure the first error is returned. An entry
    /// whose handle the backing store does not know is dropped, since no retry
    /// can succeed for it; any other failed entry is kept for a later flush.
    pub fn flush(&mut self) -> Result<(), StorageError> {
        let mut failure = None;
        for (&handle, object) in &self.entries {
            if let Err(e) = self.backing.update(object, handle) {
                failure = Some((handle, e));
                break;
            }
        }
        if let Some((handle, e)) = failure {
            if e.is_not_found() {
                tracing::warn!(handle, "dropping cached entry unknown to backing store");
                self.entries.remove(&handle);
            }
            return Err(e);
        }
        tracing::debug!(entries = self.entries.len(), "flushed write-back cache");
        Ok(())
    }

    /// Flush and hand back the backing store.
    pub fn into_inner(mut self) -> Result<S, StorageError> {
        self.flush()?;
        Ok(self.backing)
    }

    /// Flush everything, then drop it from memory.
    fn evict_all(&mut self) -> Result<(), StorageError> {
        self.flush()?;
        tracing::debug!(evicted = self.entries.len(), "evicted write-back cache");
        self.entries.clear();
        Ok(())
    }
}

impl<T: Clone, S: Storage<T>> Storage<T> for WriteBackCache<T, S> {
    fn create(&mut self, object: &T) -> Result<Handle, StorageError> {
        let handle = self.backing.create(object)?;
        if self.entries.len() >= self.capacity {
            self.evict_all()?;
        }
        self.entries.insert(handle, object.clone());
        Ok(handle)
    }

    fn update(&mut self, object: &T, handle: Handle) -> Result<(), StorageError> {
        if !self.entries.contains_key(&handle) && self.entries.len() >= self.capacity {
            self.evict_all()?;
        }
        self.entries.insert(handle, object.clone());
        Ok(())
    }

    fn load(&mut self, handle: Handle) -> Result<T, StorageError> {
        if let Some(object) = self.entries.get(&handle) {
            return Ok(object.clone());
        }
        // Misses are not cached again.
        tracing::trace!(handle, "cache miss");
        self.backing.load(handle)
    }
}
