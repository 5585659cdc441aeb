use crate::storage::BTree;
use crate::testing::cached_file_tree;

#[test]
fn test_reopen_backing_store_after_into_inner() {
    let mut tree = cached_file_tree(3, 16);
    for key in 0..300 {
        tree.insert(key * 7 % 301).expect("insert");
    }
    let root = tree.root_handle();
    let expected = tree.keys().expect("keys");

    let file = tree.into_store().into_inner().expect("flush cache");
    let mut reopened = BTree::open(file, root).expect("open");

    assert_eq!(reopened.min_degree(), 3);
    assert_eq!(reopened.keys().expect("keys"), expected);
    reopened.validate().expect("valid");
}

#[test]
fn test_unflushed_cache_hides_latest_versions_from_backing_store() {
    let mut tree = cached_file_tree(2, 1024);
    for key in 0..10 {
        tree.insert(key).expect("insert");
    }
    let root = tree.root_handle();

    // Without a flush the file still holds the empty root created first.
    let backing_root: crate::storage::Node = crate::storage::Storage::load(
        tree.store_mut().backing_mut(),
        root,
    )
    .expect("load");
    assert!(backing_root.keys().is_empty());

    tree.store_mut().flush().expect("flush");
    let backing_root: crate::storage::Node =
        crate::storage::Storage::load(tree.store_mut().backing_mut(), root).expect("load");
    assert!(!backing_root.keys().is_empty());
}
