// Storage engine layout:
//  - Storage trait: create / update / load objects by opaque handle
//  - Backends: append-only file store, in-memory store with fault injection
//  - Write-back cache layered over any backend
//  - B-tree whose nodes are resolved through the storage handle on demand
//
// Everything is single-threaded and synchronous. Mutation needs `&mut`.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used, clippy::disallowed_methods))]

pub mod config;
pub mod storage;

#[cfg(test)]
mod e2e_tests;
#[cfg(test)]
mod testing;

pub use config::{CachedFileTree, ConfigError, StoreConfig};
