use tempfile::tempdir;

use crate::storage::{BTree, BTreeError, FileStore, Node};
use crate::testing::init_tracing;

#[test]
fn test_overwritten_data_file_reports_corruption() {
    init_tracing();
    let dir = tempdir().expect("create temp dir");
    let path = dir.path().join("nodes.db");

    let store = FileStore::<Node>::create(&path).expect("create store");
    let mut tree = BTree::new(store, 2).expect("create tree");
    for key in 0..10 {
        tree.insert(key).expect("insert");
    }
    tree.store().sync().expect("sync");

    // Same length, garbage content.
    let len = std::fs::metadata(&path).expect("metadata").len();
    let len = usize::try_from(len).expect("file fits in memory");
    std::fs::write(&path, vec![0xAA; len]).expect("overwrite");

    let err = tree.contains(5).expect_err("corruption must surface");
    match err {
        BTreeError::Storage(e) => assert!(e.is_corruption(), "unexpected error: {e}"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_unknown_root_handle() {
    init_tracing();
    let store = FileStore::<Node>::temporary().expect("create store");

    let err = BTree::open(store, 12345).expect_err("open must fail");
    match err {
        BTreeError::Storage(e) => assert!(e.is_not_found()),
        other => panic!("unexpected error: {other}"),
    }
}
