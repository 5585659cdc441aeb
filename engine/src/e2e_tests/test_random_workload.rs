use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::storage::Key;
use crate::testing::{cached_file_tree, memory_tree};

/// Apply a seeded mix of inserts and deletes, checking against a sorted Vec.
fn run_workload<S: crate::storage::Storage<crate::storage::Node>>(
    tree: &mut crate::storage::BTree<S>,
    seed: u64,
    steps: usize,
) {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut live: Vec<Key> = Vec::new();

    for step in 0..steps {
        if live.is_empty() || rng.random_bool(0.55) {
            let key = rng.random_range(-500..500);
            tree.insert(key).expect("insert");
            live.push(key);
        } else if rng.random_bool(0.1) {
            let missing = 1_000 + rng.random_range(0..100);
            assert!(tree.delete(missing).is_err());
        } else {
            let key = live.swap_remove(rng.random_range(0..live.len()));
            tree.delete(key).expect("delete");
        }

        if step % 250 == 0 {
            tree.validate().expect("valid");
        }
    }

    tree.validate().expect("valid");
    live.sort_unstable();
    assert_eq!(tree.keys().expect("keys"), live);
    for key in live.iter().step_by(7) {
        assert!(tree.contains(*key).expect("contains"));
    }
}

#[test]
fn test_memory_workload_various_degrees() {
    for (seed, t) in [(1, 2), (2, 3), (3, 4), (4, 8)] {
        let mut tree = memory_tree(t);
        run_workload(&mut tree, seed, 3_000);
    }
}

#[test]
fn test_cached_file_workload() {
    let mut tree = cached_file_tree(3, 16);
    run_workload(&mut tree, 42, 3_000);
}

#[test]
fn test_drain_to_empty() {
    let mut tree = memory_tree(2);
    let mut rng = StdRng::seed_from_u64(5);
    let mut keys: Vec<Key> = (0..400).map(|_| rng.random_range(0..50)).collect();
    for &key in &keys {
        tree.insert(key).expect("insert");
    }
    let grown = tree.height().expect("height");
    assert!(grown >= 2);

    while let Some(key) = keys.pop() {
        tree.delete(key).expect("delete");
    }
    tree.validate().expect("valid");
    assert_eq!(tree.height().expect("height"), 0);
    assert!(tree.keys().expect("keys").is_empty());
}
