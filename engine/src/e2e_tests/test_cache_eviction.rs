use crate::storage::{FileStore, MIN_DEGREE, Node, Storage, WriteBackCache};
use crate::testing::init_tracing;

#[test]
fn test_capacity_one_keeps_only_newest_node() {
    init_tracing();
    let file = FileStore::<Node>::temporary().expect("create store");
    let mut cache = WriteBackCache::with_capacity(file, 1).expect("create cache");

    let first = Node::create(MIN_DEGREE, &mut cache).expect("create first");
    let second = Node::create(MIN_DEGREE, &mut cache).expect("create second");

    assert!(!cache.is_cached(first.handle()));
    assert!(cache.is_cached(second.handle()));

    // The evicted node is still reachable through the cache.
    let reloaded = Node::load(first.handle(), &mut cache).expect("load");
    assert_eq!(reloaded, first);
}

#[test]
fn test_tree_survives_constant_eviction() {
    let mut tree = crate::testing::cached_file_tree(2, 1);

    for key in (0..200).rev() {
        tree.insert(key).expect("insert");
    }
    assert!(tree.store().len() <= 1);

    tree.validate().expect("valid");
    assert_eq!(tree.keys().expect("keys"), (0..200).collect::<Vec<_>>());
}

#[test]
fn test_evicted_updates_are_written_back() {
    let file = FileStore::<Node>::temporary().expect("create store");
    let mut cache = WriteBackCache::with_capacity(file, 2).expect("create cache");

    let mut node = Node::create(2, &mut cache).expect("create");
    node.insert_non_full(7, &mut cache).expect("insert");
    assert!(cache.backing_mut().load(node.handle()).expect("load").keys().is_empty());

    // Two more creates force a full flush.
    Node::create(2, &mut cache).expect("create");
    Node::create(2, &mut cache).expect("create");

    let on_disk = cache.backing_mut().load(node.handle()).expect("load");
    assert_eq!(on_disk.keys(), &[7]);
}
