//! In-memory object store with deterministic fault injection.
//!
//! This module provides an in-memory implementation of the `Storage` trait.
//! It keeps the same append-only shape as the file store (a log of encoded
//! records plus a handle -> version table) so that round-trips still go
//! through `Record` encoding, and it supports fault injection for tests:
//! - Read errors on `load`
//! - Write errors on `create` / `update`
//!
//! Handles come from a counter owned by each store instance, so two stores
//! never share a handle sequence.

use std::collections::HashMap;
use std::marker::PhantomData;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::storage::io::{Handle, Storage, StorageError};
use crate::storage::record::Record;

/// Configuration for fault injection.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaultConfig {
    /// Probability of a read error (0.0 - 1.0).
    pub read_error_rate: f64,
    /// Probability of a write error (0.0 - 1.0).
    pub write_error_rate: f64,
}

impl FaultConfig {
    /// Create a fault config with no faults (for baseline testing).
    #[must_use]
    pub fn no_faults() -> Self {
        Self::default()
    }

    /// Create a fault config where every write fails.
    #[must_use]
    pub const fn failing_writes() -> Self {
        Self {
            read_error_rate: 0.0,
            write_error_rate: 1.0,
        }
    }

    /// Create a fault config where every read fails.
    #[must_use]
    pub const fn failing_reads() -> Self {
        Self {
            read_error_rate: 1.0,
            write_error_rate: 0.0,
        }
    }
}

/// Statistics about memory store operations.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct MemoryStoreStats {
    /// Number of successful creates.
    pub creates: u64,
    /// Number of successful updates.
    pub updates: u64,
    /// Number of successful loads.
    pub loads: u64,
    /// Number of injected read errors.
    pub injected_read_errors: u64,
    /// Number of injected write errors.
    pub injected_write_errors: u64,
}

/// An append-only in-memory store.
///
/// # Thread Safety
///
/// Not thread-safe. Everything runs on a single thread.
pub struct MemoryStore<T> {
    /// Every version ever written, in write order.
    records: Vec<Vec<u8>>,
    /// Handle -> index of the current version in `records`.
    table: HashMap<Handle, usize>,
    /// Next handle to hand out.
    next_handle: Handle,

    /// Fault injection configuration.
    fault_config: FaultConfig,
    /// Random number generator for fault injection.
    rng: StdRng,

    /// Statistics for tracking.
    stats: MemoryStoreStats,
    _record: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for MemoryStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("records", &self.records.len())
            .field("handles", &self.table.len())
            .field("next_handle", &self.next_handle)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MemoryStore<T> {
    /// Create a new store with no faults.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(0, FaultConfig::default())
    }

    /// Create a new store with custom fault configuration.
    ///
    /// The seed ensures deterministic behavior - the same seed will
    /// produce the same sequence of faults.
    #[must_use]
    pub fn with_config(seed: u64, fault_config: FaultConfig) -> Self {
        Self {
            records: Vec::new(),
            table: HashMap::new(),
            next_handle: 0,
            fault_config,
            rng: StdRng::seed_from_u64(seed),
            stats: MemoryStoreStats::default(),
            _record: PhantomData,
        }
    }

    /// Get the current statistics.
    #[must_use]
    pub const fn stats(&self) -> &MemoryStoreStats {
        &self.stats
    }

    /// Update the fault configuration.
    pub const fn set_fault_config(&mut self, config: FaultConfig) {
        self.fault_config = config;
    }

    /// Number of handles handed out.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether no handle has been handed out yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Number of record versions written, including superseded ones.
    #[must_use]
    pub fn versions(&self) -> usize {
        self.records.len()
    }

    /// Check if a fault should be injected based on the given rate.
    fn should_inject_fault(&mut self, rate: f64) -> bool {
        if rate <= 0.0 {
            return false;
        }
        if rate >= 1.0 {
            return true;
        }
        self.rng.random_bool(rate)
    }

    fn check_write_fault(&mut self) -> Result<(), StorageError> {
        if self.should_inject_fault(self.fault_config.write_error_rate) {
            self.stats.injected_write_errors += 1;
            return Err(StorageError::Io(std::io::Error::other(
                "injected write fault",
            )));
        }
        Ok(())
    }

    fn check_read_fault(&mut self) -> Result<(), StorageError> {
        if self.should_inject_fault(self.fault_config.read_error_rate) {
            self.stats.injected_read_errors += 1;
            return Err(StorageError::Io(std::io::Error::other(
                "injected read fault",
            )));
        }
        Ok(())
    }
}

impl<T: Record> Storage<T> for MemoryStore<T> {
    fn create(&mut self, object: &T) -> Result<Handle, StorageError> {
        self.check_write_fault()?;

        let handle = self.next_handle;
        self.next_handle += 1;
        self.records.push(object.encode());
        self.table.insert(handle, self.records.len() - 1);
        self.stats.creates += 1;
        Ok(handle)
    }

    fn update(&mut self, object: &T, handle: Handle) -> Result<(), StorageError> {
        if !self.table.contains_key(&handle) {
            return Err(StorageError::UnknownHandle(handle));
        }
        self.check_write_fault()?;

        self.records.push(object.encode());
        self.table.insert(handle, self.records.len() - 1);
        self.stats.updates += 1;
        Ok(())
    }

    fn load(&mut self, handle: Handle) -> Result<T, StorageError> {
        let index = *self
            .table
            .get(&handle)
            .ok_or(StorageError::UnknownHandle(handle))?;
        self.check_read_fault()?;

        let object =
            T::decode(&self.records[index]).map_err(|source| StorageError::Decode { handle, source })?;
        self.stats.loads += 1;
        Ok(object)
    }
}
