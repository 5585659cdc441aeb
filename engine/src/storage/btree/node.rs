//! B-tree node type, balancing operations and serialization.
//!
//! A node never owns its children. It holds their handles and resolves them
//! through a `Storage` on demand, so every descent is a sequence of fallible
//! loads rather than pointer dereferences.
//!
//! # Record Format
//!
//! Nodes are stored as a protobuf message:
//! - `min_degree`: uint64 (tag 1)
//! - `keys`: repeated sint64 (tag 2)
//! - `children`: repeated uint64 handles (tag 3)
//!
//! A node's own handle is not part of its record. It is attached when the
//! node is loaded.

use prost::Message;

use crate::storage::btree::tree::BTreeError;
use crate::storage::io::{Handle, Storage};
use crate::storage::record::{DecodeError, Record};

/// A key stored in the tree.
pub type Key = i64;

/// Smallest usable minimum degree. Anything lower degenerates into a list.
pub const MIN_DEGREE: usize = 2;

/// Largest minimum degree for which `2t - 1` still fits in a `usize`.
pub const MAX_MIN_DEGREE: usize = usize::MAX / 2;

/// Placeholder handle for a node that has not been attached to a store yet.
const UNASSIGNED: Handle = Handle::MAX;

/// Stored representation of a node.
#[derive(Clone, PartialEq, Message)]
struct NodeRecord {
    #[prost(uint64, tag = "1")]
    min_degree: u64,
    #[prost(sint64, repeated, tag = "2")]
    keys: Vec<i64>,
    #[prost(uint64, repeated, tag = "3")]
    children: Vec<u64>,
}

/// A B-tree node.
///
/// Stores N keys and, when internal, N+1 child handles.
/// Keys of `children[i]` lie within `[keys[i-1], keys[i]]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Identity of this node in its store. Assigned once by `create`.
    handle: Handle,
    min_degree: usize,
    /// Keys in non-decreasing order. Duplicates allowed.
    keys: Vec<Key>,
    /// Child handles. Empty for a leaf, otherwise `keys.len()` + 1.
    children: Vec<Handle>,
}

impl Node {
    /// Create a new empty leaf and persist it, assigning its handle.
    pub fn create<S: Storage<Self>>(min_degree: usize, store: &mut S) -> Result<Self, BTreeError> {
        if !(MIN_DEGREE..=MAX_MIN_DEGREE).contains(&min_degree) {
            return Err(BTreeError::InvalidMinDegree(min_degree));
        }
        let mut node = Self {
            handle: UNASSIGNED,
            min_degree,
            keys: Vec::new(),
            children: Vec::new(),
        };
        node.handle = store.create(&node)?;
        Ok(node)
    }

    /// Load the node behind `handle`.
    pub fn load<S: Storage<Self>>(handle: Handle, store: &mut S) -> Result<Self, BTreeError> {
        let mut node = store.load(handle)?;
        node.handle = handle;
        Ok(node)
    }

    /// Write the current state of this node back under its handle.
    fn persist<S: Storage<Self>>(&self, store: &mut S) -> Result<(), BTreeError> {
        store.update(self, self.handle)?;
        Ok(())
    }

    /// The handle this node is stored under.
    #[must_use]
    pub const fn handle(&self) -> Handle {
        self.handle
    }

    #[must_use]
    pub const fn min_degree(&self) -> usize {
        self.min_degree
    }

    #[must_use]
    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    #[must_use]
    pub fn children(&self) -> &[Handle] {
        &self.children
    }

    #[must_use]
    #[allow(clippy::missing_const_for_fn)]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Check if the node holds the maximum number of keys.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.keys.len() >= self.max_keys()
    }

    const fn max_keys(&self) -> usize {
        2 * self.min_degree - 1
    }

    /// Leftmost position at which `key` could be inserted.
    ///
    /// Also the index of the only child that can hold `key` when it is not
    /// one of this node's own keys.
    fn find_position(&self, key: Key) -> usize {
        self.keys.partition_point(|&k| k < key)
    }

    /// Check whether `key` is stored in this subtree.
    pub fn contains<S: Storage<Self>>(&self, key: Key, store: &mut S) -> Result<bool, BTreeError> {
        if self.keys.binary_search(&key).is_ok() {
            return Ok(true);
        }
        if self.is_leaf() {
            return Ok(false);
        }
        let child = Self::load(self.children[self.find_position(key)], store)?;
        child.contains(key, store)
    }

    /// Insert `key` into the subtree rooted at this node.
    ///
    /// # Pre-conditions
    /// - this node is not full
    ///
    /// Full children met on the way down are split before descending into
    /// them, so the recursion never enters a full node.
    pub fn insert_non_full<S: Storage<Self>>(
        &mut self,
        key: Key,
        store: &mut S,
    ) -> Result<(), BTreeError> {
        debug_assert!(!self.is_full(), "insert_non_full called on a full node");

        if self.is_leaf() {
            let position = self.find_position(key);
            self.keys.insert(position, key);
            return self.persist(store);
        }

        loop {
            // A split changes which child covers the key, so look again.
            let index = self.find_position(key);
            let mut child = Self::load(self.children[index], store)?;
            if child.is_full() {
                self.split_child(&mut child, store)?;
                continue;
            }
            return child.insert_non_full(key, store);
        }
    }

    /// Split a full child of this node.
    ///
    /// The child's median moves up into this node, its upper half moves to a
    /// new sibling placed right after it. Sibling, child and this node are
    /// all persisted.
    pub fn split_child<S: Storage<Self>>(
        &mut self,
        child: &mut Self,
        store: &mut S,
    ) -> Result<(), BTreeError> {
        let position = self
            .children
            .iter()
            .position(|&h| h == child.handle)
            .ok_or(BTreeError::NotAChild {
                parent: self.handle,
                child: child.handle,
            })?;
        debug_assert!(child.is_full(), "split_child called on a non-full child");

        let t = self.min_degree;
        let median = child.keys[t - 1];

        let mut sibling = Self::create(t, store)?;
        sibling.keys = child.keys.split_off(t);
        child.keys.truncate(t - 1);
        if !child.is_leaf() {
            let half = child.children.len() / 2;
            sibling.children = child.children.split_off(half);
        }

        self.keys.insert(position, median);
        self.children.insert(position + 1, sibling.handle);
        debug_assert!(self.keys.is_sorted(), "median promoted out of order");

        sibling.persist(store)?;
        child.persist(store)?;
        self.persist(store)
    }

    /// Put a new root above the full node `old_root` and split it.
    ///
    /// Returns the new root, which holds the promoted median and two children.
    pub fn grow_root<S: Storage<Self>>(old_root: &mut Self, store: &mut S) -> Result<Self, BTreeError> {
        let mut root = Self::create(old_root.min_degree, store)?;
        root.children.push(old_root.handle);
        root.split_child(old_root, store)?;
        Ok(root)
    }

    /// Remove one occurrence of `key` from this node's own keys.
    ///
    /// Only touches this node: no rebalancing, no persistence. Returns
    /// whether a key was removed.
    pub fn remove(&mut self, key: Key) -> bool {
        match self.keys.binary_search(&key) {
            Ok(index) => {
                self.keys.remove(index);
                true
            }
            Err(_) => false,
        }
    }

    /// Delete one occurrence of `key` from the subtree rooted at this node,
    /// rebalancing on the way down.
    ///
    /// # Pre-conditions
    /// - this node is the root, or holds at least `min_degree` keys
    ///
    /// Returns whether a key was deleted. The subtree may be restructured
    /// even when the key is absent. An internal root can be left without
    /// keys; the caller replaces it with its only child.
    pub fn delete<S: Storage<Self>>(&mut self, key: Key, store: &mut S) -> Result<bool, BTreeError> {
        let index = self.find_position(key);
        let found = self.keys.get(index) == Some(&key);

        if self.is_leaf() {
            if !self.remove(key) {
                return Ok(false);
            }
            self.persist(store)?;
            return Ok(true);
        }

        if found {
            self.delete_internal_key(index, store)?;
            return Ok(true);
        }

        let mut child = self.ensure_child_has_spare_key(index, store)?;
        child.delete(key, store)
    }

    /// Delete `keys[index]` from an internal node.
    fn delete_internal_key<S: Storage<Self>>(
        &mut self,
        index: usize,
        store: &mut S,
    ) -> Result<(), BTreeError> {
        let key = self.keys[index];
        let t = self.min_degree;

        let mut left = Self::load(self.children[index], store)?;
        if left.keys.len() >= t {
            let predecessor = left.max_key(store)?;
            Self::expect_deleted(left.delete(predecessor, store)?, predecessor)?;
            self.keys[index] = predecessor;
            return self.persist(store);
        }

        let mut right = Self::load(self.children[index + 1], store)?;
        if right.keys.len() >= t {
            let successor = right.min_key(store)?;
            Self::expect_deleted(right.delete(successor, store)?, successor)?;
            self.keys[index] = successor;
            return self.persist(store);
        }

        self.merge_children(index, &mut left, right, store)?;
        Self::expect_deleted(left.delete(key, store)?, key)
    }

    /// A key known to be in a subtree must come out of it.
    fn expect_deleted(deleted: bool, key: Key) -> Result<(), BTreeError> {
        if deleted {
            return Ok(());
        }
        Err(BTreeError::InvariantViolation(format!(
            "key {key} is in the subtree but was not deleted"
        )))
    }

    /// Make sure `children[index]` holds at least `min_degree` keys before
    /// descending into it, borrowing from a sibling or merging with one.
    ///
    /// Returns the node to descend into.
    fn ensure_child_has_spare_key<S: Storage<Self>>(
        &mut self,
        index: usize,
        store: &mut S,
    ) -> Result<Self, BTreeError> {
        let t = self.min_degree;
        let mut child = Self::load(self.children[index], store)?;
        if child.keys.len() >= t {
            return Ok(child);
        }

        if index > 0 {
            let mut left = Self::load(self.children[index - 1], store)?;
            if left.keys.len() >= t {
                let borrowed = left.keys.remove(left.keys.len() - 1);
                let separator = std::mem::replace(&mut self.keys[index - 1], borrowed);
                child.keys.insert(0, separator);
                if !left.is_leaf() {
                    let moved = left.children.remove(left.children.len() - 1);
                    child.children.insert(0, moved);
                }
                left.persist(store)?;
                child.persist(store)?;
                self.persist(store)?;
                return Ok(child);
            }
        }

        if index + 1 < self.children.len() {
            let mut right = Self::load(self.children[index + 1], store)?;
            if right.keys.len() >= t {
                let borrowed = right.keys.remove(0);
                let separator = std::mem::replace(&mut self.keys[index], borrowed);
                child.keys.push(separator);
                if !right.is_leaf() {
                    child.children.push(right.children.remove(0));
                }
                right.persist(store)?;
                child.persist(store)?;
                self.persist(store)?;
                return Ok(child);
            }
            self.merge_children(index, &mut child, right, store)?;
            return Ok(child);
        }

        let Some(left_index) = index.checked_sub(1) else {
            return Err(BTreeError::InvariantViolation(format!(
                "node {} has a single child and no keys to rebalance with",
                self.handle
            )));
        };
        let mut left = Self::load(self.children[left_index], store)?;
        self.merge_children(left_index, &mut left, child, store)?;
        Ok(left)
    }

    /// Merge `children[index + 1]` and the separator `keys[index]` into
    /// `children[index]`. The right node is abandoned in the store.
    fn merge_children<S: Storage<Self>>(
        &mut self,
        index: usize,
        left: &mut Self,
        right: Self,
        store: &mut S,
    ) -> Result<(), BTreeError> {
        let separator = self.keys.remove(index);
        self.children.remove(index + 1);

        left.keys.push(separator);
        left.keys.extend(right.keys);
        left.children.extend(right.children);

        left.persist(store)?;
        self.persist(store)
    }

    /// Largest key in this subtree.
    fn max_key<S: Storage<Self>>(&self, store: &mut S) -> Result<Key, BTreeError> {
        let mut node = self.clone();
        while let Some(&last) = node.children.last() {
            node = Self::load(last, store)?;
        }
        node.keys.last().copied().ok_or_else(|| {
            BTreeError::InvariantViolation(format!("leaf {} is empty", node.handle))
        })
    }

    /// Smallest key in this subtree.
    fn min_key<S: Storage<Self>>(&self, store: &mut S) -> Result<Key, BTreeError> {
        let mut node = self.clone();
        while let Some(&first) = node.children.first() {
            node = Self::load(first, store)?;
        }
        node.keys.first().copied().ok_or_else(|| {
            BTreeError::InvariantViolation(format!("leaf {} is empty", node.handle))
        })
    }

    /// All nodes below this one, depth-first, left to right.
    pub fn descendants<S: Storage<Self>>(&self, store: &mut S) -> Result<Vec<Self>, BTreeError> {
        let mut result = Vec::new();
        let mut pending: Vec<Handle> = self.children.iter().rev().copied().collect();
        while let Some(handle) = pending.pop() {
            let node = Self::load(handle, store)?;
            pending.extend(node.children.iter().rev());
            result.push(node);
        }
        Ok(result)
    }

    /// All leaves of this subtree, left to right.
    pub fn leaves<S: Storage<Self>>(&self, store: &mut S) -> Result<Vec<Self>, BTreeError> {
        if self.is_leaf() {
            return Ok(vec![self.clone()]);
        }
        let mut leaves = self.descendants(store)?;
        leaves.retain(Self::is_leaf);
        Ok(leaves)
    }

    /// Number of edges between this node and the descendant `target`.
    ///
    /// Returns `None` if `target` is not in this subtree.
    pub fn path_length_to<S: Storage<Self>>(
        &self,
        target: Handle,
        store: &mut S,
    ) -> Result<Option<usize>, BTreeError> {
        if target == self.handle {
            return Ok(Some(0));
        }
        let mut pending: Vec<(Handle, usize)> = self.children.iter().map(|&h| (h, 1)).collect();
        while let Some((handle, depth)) = pending.pop() {
            if handle == target {
                return Ok(Some(depth));
            }
            let node = Self::load(handle, store)?;
            pending.extend(node.children.iter().map(|&h| (h, depth + 1)));
        }
        Ok(None)
    }

    /// Check that every key in this subtree lies within `[low, high]`.
    ///
    /// Each child is checked against the interval bracketed by its
    /// neighbouring separator keys.
    pub fn keys_within<S: Storage<Self>>(
        &self,
        low: Key,
        high: Key,
        store: &mut S,
    ) -> Result<bool, BTreeError> {
        if self.keys.iter().any(|&k| k < low || k > high) {
            return Ok(false);
        }
        for (i, &handle) in self.children.iter().enumerate() {
            let child_low = i.checked_sub(1).map_or(low, |j| self.keys[j]);
            let child_high = self.keys.get(i).copied().unwrap_or(high);
            let child = Self::load(handle, store)?;
            if !child.keys_within(child_low, child_high, store)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Keys of this subtree in sorted order.
    pub fn in_order_keys<S: Storage<Self>>(&self, store: &mut S) -> Result<Vec<Key>, BTreeError> {
        let mut out = Vec::new();
        self.collect_in_order(store, &mut out)?;
        Ok(out)
    }

    fn collect_in_order<S: Storage<Self>>(
        &self,
        store: &mut S,
        out: &mut Vec<Key>,
    ) -> Result<(), BTreeError> {
        if self.is_leaf() {
            out.extend_from_slice(&self.keys);
            return Ok(());
        }
        for (i, &handle) in self.children.iter().enumerate() {
            Self::load(handle, store)?.collect_in_order(store, out)?;
            if let Some(&key) = self.keys.get(i) {
                out.push(key);
            }
        }
        Ok(())
    }
}

impl Record for Node {
    fn encode(&self) -> Vec<u8> {
        NodeRecord {
            min_degree: self.min_degree as u64,
            keys: self.keys.clone(),
            children: self.children.clone(),
        }
        .encode_to_vec()
    }

    fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let record = <NodeRecord as Message>::decode(bytes)?;

        let min_degree = usize::try_from(record.min_degree)
            .map_err(|_| DecodeError::Invalid(format!("min_degree {} overflows", record.min_degree)))?;
        if !(MIN_DEGREE..=MAX_MIN_DEGREE).contains(&min_degree) {
            return Err(DecodeError::Invalid(format!(
                "min_degree {min_degree} is outside {MIN_DEGREE}..={MAX_MIN_DEGREE}"
            )));
        }
        if !record.children.is_empty() && record.children.len() != record.keys.len() + 1 {
            return Err(DecodeError::Invalid(format!(
                "{} children for {} keys",
                record.children.len(),
                record.keys.len()
            )));
        }

        Ok(Self {
            handle: UNASSIGNED,
            min_degree,
            keys: record.keys,
            children: record.children,
        })
    }
}
