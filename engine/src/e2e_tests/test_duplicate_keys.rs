use crate::storage::Node;
use crate::testing::{cached_file_tree, memory_tree};

#[test]
fn test_four_equal_keys() {
    let mut tree = cached_file_tree(2, 8);

    for _ in 0..4 {
        tree.insert(100).expect("insert");
    }

    let root = tree.root().expect("root");
    assert_eq!(root.keys(), &[100]);
    let left = Node::load(root.children()[0], tree.store_mut()).expect("load left");
    let right = Node::load(root.children()[1], tree.store_mut()).expect("load right");
    assert_eq!(left.keys(), &[100, 100]);
    assert_eq!(right.keys(), &[100]);
    tree.validate().expect("valid");
}

#[test]
fn test_many_duplicates_mixed_with_distinct_keys() {
    let mut tree = memory_tree(3);

    for round in 0..20 {
        tree.insert(50).expect("insert");
        tree.insert(round).expect("insert");
        tree.insert(100 - round).expect("insert");
    }
    tree.validate().expect("valid");

    let keys = tree.keys().expect("keys");
    assert_eq!(keys.len(), 60);
    assert_eq!(keys.iter().filter(|&&k| k == 50).count(), 20);

    for _ in 0..20 {
        tree.delete(50).expect("delete");
    }
    tree.validate().expect("valid");
    assert!(!tree.contains(50).expect("contains"));
    assert_eq!(tree.keys().expect("keys").len(), 40);
}
