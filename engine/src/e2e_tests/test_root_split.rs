use crate::storage::{Node, Storage};
use crate::testing::cached_file_tree;

#[test]
fn test_fourth_insert_splits_root() {
    let mut tree = cached_file_tree(2, 8);

    for key in [1234, 5678, 9012, 3456] {
        tree.insert(key).expect("insert");
    }

    let root = tree.root().expect("root");
    assert_eq!(root.keys(), &[5678]);
    assert_eq!(root.children().len(), 2);

    let left = Node::load(root.children()[0], tree.store_mut()).expect("load left");
    let right = Node::load(root.children()[1], tree.store_mut()).expect("load right");
    assert_eq!(left.keys(), &[1234, 3456]);
    assert_eq!(right.keys(), &[9012]);
    assert!(left.is_leaf());
    assert!(right.is_leaf());

    for key in [1234, 5678, 9012, 3456] {
        assert!(tree.contains(key).expect("contains"));
    }
    assert!(!tree.contains(0).expect("contains"));
    tree.validate().expect("valid");
}

#[test]
fn test_split_nodes_reach_backing_store_on_flush() {
    let mut tree = cached_file_tree(2, 8);
    for key in [1234, 5678, 9012, 3456] {
        tree.insert(key).expect("insert");
    }
    let root_handle = tree.root_handle();

    tree.store_mut().flush().expect("flush");
    let root: Node = tree
        .store_mut()
        .backing_mut()
        .load(root_handle)
        .expect("load root from file");
    assert_eq!(root.keys(), &[5678]);
}
