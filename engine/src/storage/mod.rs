//! Handle-addressed object storage and the B-tree built on it.
//!
//! # Layers
//!
//! - `Storage`: create / update / load objects by opaque handle
//! - `FileStore`: append-only data file with checksummed record frames
//! - `MemoryStore`: in-memory log with seeded fault injection, for tests
//! - `WriteBackCache`: bounded write-back cache in front of any store
//! - `btree`: a B-tree whose nodes live in any of the above
//!
//! # Usage
//!
//! ```ignore
//! use engine::storage::{BTree, FileStore, WriteBackCache};
//!
//! let cache = WriteBackCache::new(FileStore::temporary()?);
//! let mut tree = BTree::new(cache, 32)?;
//!
//! tree.insert(1234)?;
//! assert!(tree.contains(1234)?);
//!
//! // Write cached nodes back before dropping the tree.
//! tree.store_mut().flush()?;
//! ```

pub mod btree;
mod cache;
mod file;
mod io;
mod memory;
mod record;

pub use btree::{BTree, BTreeError, Key, MAX_MIN_DEGREE, MIN_DEGREE, Node};
pub use cache::{DEFAULT_CACHE_CAPACITY, WriteBackCache};
pub use file::FileStore;
pub use io::{Handle, Storage, StorageError};
pub use memory::{FaultConfig, MemoryStore, MemoryStoreStats};
pub use record::{DecodeError, Record};
