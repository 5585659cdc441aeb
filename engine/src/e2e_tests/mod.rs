//! End-to-end tests at the tree level.
//!
//! Each test file covers a specific scenario, running a B-tree over a real
//! store stack (file store, write-back cache, or fault-injecting memory
//! store) with deterministic inputs.

#![cfg(test)]

mod test_cache_eviction;
mod test_corruption;
mod test_duplicate_keys;
mod test_faults;
mod test_flush_and_reopen;
mod test_random_workload;
mod test_root_split;
