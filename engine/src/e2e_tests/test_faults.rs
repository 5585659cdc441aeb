use crate::storage::{BTreeError, FaultConfig, StorageError};
use crate::testing::{cached_file_tree, faulty_memory_tree, memory_tree};

#[test]
fn test_write_fault_surfaces_from_insert() {
    let mut tree = faulty_memory_tree(2, 1, FaultConfig::failing_writes());

    let err = tree.insert(1).expect_err("write must fail");
    assert!(matches!(err, BTreeError::Storage(StorageError::Io(_))));
    assert_eq!(tree.store().stats().injected_write_errors, 1);
}

#[test]
fn test_read_fault_surfaces_from_contains() {
    let mut tree = memory_tree(2);
    tree.insert(1).expect("insert");

    tree.store_mut().set_fault_config(FaultConfig::failing_reads());
    assert!(matches!(
        tree.contains(1),
        Err(BTreeError::Storage(StorageError::Io(_)))
    ));

    tree.store_mut().set_fault_config(FaultConfig::no_faults());
    assert!(tree.contains(1).expect("contains"));
}

#[test]
fn test_random_faults_never_panic() {
    let faults = FaultConfig {
        read_error_rate: 0.05,
        write_error_rate: 0.05,
    };
    let mut tree = faulty_memory_tree(3, 99, faults);
    let mut failures = 0;

    for key in 0..500 {
        if tree.insert(key).is_err() {
            failures += 1;
        }
    }

    assert!(failures > 0);
    let stats = *tree.store().stats();
    assert_eq!(
        failures,
        stats.injected_read_errors + stats.injected_write_errors
    );
}

#[test]
fn test_cache_flush_failure_is_not_swallowed() {
    let mut tree = cached_file_tree(2, 1024);
    for key in 0..50 {
        tree.insert(key).expect("insert");
    }
    let root = tree.root_handle();

    // Repoint a cached node at a handle the file never issued.
    let node = tree.root().expect("root");
    crate::storage::Storage::update(tree.store_mut(), &node, root + 1_000_000).expect("update");

    let err = tree.store_mut().flush().expect_err("flush must fail");
    assert!(err.is_not_found());
    assert!(tree.store().is_cached(root));

    // The rejected entry is gone, so the next flush goes through.
    tree.store_mut().flush().expect("flush");
    assert_eq!(tree.keys().expect("keys"), (0..50).collect::<Vec<_>>());
}
