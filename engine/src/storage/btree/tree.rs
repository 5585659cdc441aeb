//! B-tree over handle-addressed nodes.
//!
//! The tree only remembers its root handle. Every node is reached by loading
//! it from the store, so the same tree code runs unchanged over a file store,
//! an in-memory store or a write-back cache in front of either.

use crate::storage::btree::node::{Key, MAX_MIN_DEGREE, MIN_DEGREE, Node};
use crate::storage::io::{Handle, Storage, StorageError};

/// Errors that can occur during B-tree operations.
#[derive(Debug)]
pub enum BTreeError {
    /// Minimum degree outside `MIN_DEGREE..=MAX_MIN_DEGREE`.
    InvalidMinDegree(usize),
    /// The key to delete is not in the tree.
    KeyNotFound(Key),
    /// A node was asked to split a node that is not one of its children.
    NotAChild { parent: Handle, child: Handle },
    /// The tree structure broke one of its invariants.
    InvariantViolation(String),
    /// The underlying store failed.
    Storage(StorageError),
}

impl std::fmt::Display for BTreeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMinDegree(t) => {
                write!(
                    f,
                    "invalid minimum degree {t} (must be at least {MIN_DEGREE} and at most {MAX_MIN_DEGREE})"
                )
            }
            Self::KeyNotFound(key) => write!(f, "key {key} not found"),
            Self::NotAChild { parent, child } => {
                write!(f, "node {child} is not a child of node {parent}")
            }
            Self::InvariantViolation(msg) => write!(f, "invariant violation: {msg}"),
            Self::Storage(e) => write!(f, "storage error: {e}"),
        }
    }
}

impl std::error::Error for BTreeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Storage(e) => Some(e),
            _ => None,
        }
    }
}

impl From<StorageError> for BTreeError {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

/// A B-tree of `i64` keys with duplicates allowed.
///
/// # Invariants
/// - every node except the root holds between `t - 1` and `2t - 1` keys
/// - the root holds at most `2t - 1` keys and is never an internal node
///   without keys between operations
/// - all leaves are at the same depth
/// - keys of `children[i]` lie within `[keys[i-1], keys[i]]`
pub struct BTree<S> {
    store: S,
    root: Handle,
    min_degree: usize,
}

impl<S: std::fmt::Debug> std::fmt::Debug for BTree<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BTree")
            .field("root", &self.root)
            .field("min_degree", &self.min_degree)
            .field("store", &self.store)
            .finish()
    }
}

impl<S: Storage<Node>> BTree<S> {
    /// Create an empty tree whose root is a fresh leaf in `store`.
    pub fn new(mut store: S, min_degree: usize) -> Result<Self, BTreeError> {
        let root = Node::create(min_degree, &mut store)?;
        tracing::debug!(root = root.handle(), min_degree, "created B-tree");
        Ok(Self {
            store,
            root: root.handle(),
            min_degree,
        })
    }

    /// Reattach to a tree whose root is already in `store`.
    pub fn open(mut store: S, root: Handle) -> Result<Self, BTreeError> {
        let node = Node::load(root, &mut store)?;
        Ok(Self {
            store,
            root,
            min_degree: node.min_degree(),
        })
    }

    /// Handle of the current root. Changes when the root splits or collapses.
    #[must_use]
    pub const fn root_handle(&self) -> Handle {
        self.root
    }

    #[must_use]
    pub const fn min_degree(&self) -> usize {
        self.min_degree
    }

    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Give up the tree and return its store.
    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    /// Load the current root node.
    pub fn root(&mut self) -> Result<Node, BTreeError> {
        Node::load(self.root, &mut self.store)
    }

    /// Insert a key. Duplicates are kept.
    pub fn insert(&mut self, key: Key) -> Result<(), BTreeError> {
        let mut root = self.root()?;
        if root.is_full() {
            let new_root = Node::grow_root(&mut root, &mut self.store)?;
            tracing::debug!(
                old_root = root.handle(),
                new_root = new_root.handle(),
                "root split, tree grew by one level"
            );
            self.root = new_root.handle();
            root = new_root;
        }
        root.insert_non_full(key, &mut self.store)
    }

    /// Check whether the key is stored anywhere in the tree.
    pub fn contains(&mut self, key: Key) -> Result<bool, BTreeError> {
        let root = self.root()?;
        root.contains(key, &mut self.store)
    }

    /// Delete one occurrence of a key.
    ///
    /// Returns `KeyNotFound` without touching the tree if the key is absent.
    pub fn delete(&mut self, key: Key) -> Result<(), BTreeError> {
        let mut root = self.root()?;
        if !root.contains(key, &mut self.store)? {
            return Err(BTreeError::KeyNotFound(key));
        }
        if !root.delete(key, &mut self.store)? {
            return Err(BTreeError::InvariantViolation(format!(
                "key {key} was found but could not be deleted"
            )));
        }

        if root.keys().is_empty() && !root.is_leaf() {
            let old_root = self.root;
            self.root = root.children()[0];
            tracing::debug!(old_root, new_root = self.root, "root collapsed, tree shrank by one level");
        }
        Ok(())
    }

    /// All keys in sorted order.
    pub fn keys(&mut self) -> Result<Vec<Key>, BTreeError> {
        let root = self.root()?;
        root.in_order_keys(&mut self.store)
    }

    /// Number of edges from the root down to the leaves.
    pub fn height(&mut self) -> Result<usize, BTreeError> {
        let mut node = self.root()?;
        let mut height = 0;
        while let Some(&first) = node.children().first() {
            node = Node::load(first, &mut self.store)?;
            height += 1;
        }
        Ok(height)
    }

    /// Walk the whole tree and check every structural invariant.
    pub fn validate(&mut self) -> Result<(), BTreeError> {
        let mut leaf_depth = None;
        self.validate_node(self.root, 0, &mut leaf_depth)?;

        let root = self.root()?;
        if !root.keys_within(Key::MIN, Key::MAX, &mut self.store)? {
            return Err(BTreeError::InvariantViolation(
                "a key lies outside the range of its separators".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_node(
        &mut self,
        handle: Handle,
        depth: usize,
        leaf_depth: &mut Option<usize>,
    ) -> Result<(), BTreeError> {
        let node = Node::load(handle, &mut self.store)?;
        let t = self.min_degree;
        let is_root = handle == self.root;
        let violation = |msg: String| Err(BTreeError::InvariantViolation(msg));

        if node.min_degree() != t {
            return violation(format!(
                "node {handle} has minimum degree {}, tree has {t}",
                node.min_degree()
            ));
        }
        if !node.keys().is_sorted() {
            return violation(format!("node {handle} keys are out of order"));
        }
        if node.keys().len() > 2 * t - 1 {
            return violation(format!("node {handle} holds {} keys", node.keys().len()));
        }
        if !is_root && node.keys().len() < t - 1 {
            return violation(format!("node {handle} underflows with {} keys", node.keys().len()));
        }
        if is_root && !node.is_leaf() && node.keys().is_empty() {
            return violation(format!("internal root {handle} has no keys"));
        }

        if node.is_leaf() {
            let expected = *leaf_depth.get_or_insert(depth);
            if expected != depth {
                return violation(format!("leaf {handle} at depth {depth}, expected {expected}"));
            }
            return Ok(());
        }

        if node.children().len() != node.keys().len() + 1 {
            return violation(format!(
                "node {handle} has {} children for {} keys",
                node.children().len(),
                node.keys().len()
            ));
        }
        for &child in node.children() {
            self.validate_node(child, depth + 1, leaf_depth)?;
        }
        Ok(())
    }
}
