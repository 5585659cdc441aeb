//! Disk-resident B-tree.
//!
//! Nodes refer to each other by storage handle and are loaded on demand, so
//! the tree never holds more than a root-to-leaf path in memory.

mod node;
mod tree;

pub use node::{Key, MAX_MIN_DEGREE, MIN_DEGREE, Node};
pub use tree::{BTree, BTreeError};
