use std::sync::Once;

use crate::storage::{
    BTree, FaultConfig, FileStore, MemoryStore, Node, WriteBackCache,
};

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness.
///
/// Filter with `RUST_LOG`, e.g. `RUST_LOG=engine=debug cargo test`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "engine=warn".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

/// A tree over a fresh in-memory store.
pub fn memory_tree(min_degree: usize) -> BTree<MemoryStore<Node>> {
    init_tracing();
    BTree::new(MemoryStore::new(), min_degree).expect("create memory tree")
}

/// A tree over an in-memory store that injects faults with the given seed.
pub fn faulty_memory_tree(
    min_degree: usize,
    seed: u64,
    faults: FaultConfig,
) -> BTree<MemoryStore<Node>> {
    init_tracing();
    let mut tree =
        BTree::new(MemoryStore::with_config(seed, FaultConfig::no_faults()), min_degree)
            .expect("create memory tree");
    tree.store_mut().set_fault_config(faults);
    tree
}

/// A tree over a temp-file store behind a write-back cache.
pub fn cached_file_tree(
    min_degree: usize,
    capacity: usize,
) -> BTree<WriteBackCache<Node, FileStore<Node>>> {
    init_tracing();
    let file = FileStore::temporary().expect("create temp file store");
    let cache = WriteBackCache::with_capacity(file, capacity).expect("create cache");
    BTree::new(cache, min_degree).expect("create cached tree")
}
