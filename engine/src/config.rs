//! Store configuration module.
//!
//! This module provides configuration loading for a cached, file-backed
//! B-tree from environment variables.
//!
//! # Environment Variables
//!
//! - `BTREE_MIN_DEGREE`: Minimum degree of every node (default: `32`)
//! - `BTREE_CACHE_CAPACITY`: Write-back cache size in nodes (default: `8192`)
//! - `BTREE_DATA_FILE`: Path of a fresh data file (default: anonymous temp file)
//!
//! # Invariants
//!
//! - `min_degree` is always within `MIN_DEGREE..=MAX_MIN_DEGREE`
//! - `cache_capacity` is always positive

use std::path::PathBuf;

use crate::storage::{
    BTree, BTreeError, DEFAULT_CACHE_CAPACITY, FileStore, MAX_MIN_DEGREE, MIN_DEGREE, Node,
    WriteBackCache,
};

/// A B-tree whose nodes live in a data file behind a write-back cache.
pub type CachedFileTree = BTree<WriteBackCache<Node, FileStore<Node>>>;

const MIN_DEGREE_VAR: &str = "BTREE_MIN_DEGREE";
const CACHE_CAPACITY_VAR: &str = "BTREE_CACHE_CAPACITY";
const DATA_FILE_VAR: &str = "BTREE_DATA_FILE";

/// Store configuration.
///
/// # Post-conditions
///
/// When constructed via `from_env()`:
/// - `MIN_DEGREE <= min_degree <= MAX_MIN_DEGREE`
/// - `cache_capacity > 0`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Minimum degree of every node in the tree.
    pub min_degree: usize,
    /// Number of nodes the write-back cache holds before flushing.
    pub cache_capacity: usize,
    /// Data file to create. `None` means an anonymous temp file.
    pub data_file: Option<PathBuf>,
}

/// Error returned when loading configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            min_degree: Self::DEFAULT_MIN_DEGREE,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            data_file: None,
        }
    }
}

impl StoreConfig {
    /// Default minimum degree.
    pub const DEFAULT_MIN_DEGREE: usize = 32;

    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable is set but not a number, or is
    /// out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable lookup.
    ///
    /// Unset variables fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let min_degree = match lookup(MIN_DEGREE_VAR) {
            Some(value) => parse_in_range(MIN_DEGREE_VAR, &value, MIN_DEGREE, MAX_MIN_DEGREE)?,
            None => Self::DEFAULT_MIN_DEGREE,
        };
        let cache_capacity = match lookup(CACHE_CAPACITY_VAR) {
            Some(value) => parse_in_range(CACHE_CAPACITY_VAR, &value, 1, usize::MAX)?,
            None => DEFAULT_CACHE_CAPACITY,
        };
        let data_file = lookup(DATA_FILE_VAR)
            .filter(|value| !value.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            min_degree,
            cache_capacity,
            data_file,
        })
    }

    /// Create the data file and an empty tree on top of it.
    ///
    /// # Errors
    ///
    /// Returns an error if the data file already exists or cannot be created,
    /// or if the configuration is out of range.
    pub fn open_tree(&self) -> Result<CachedFileTree, BTreeError> {
        let file = match &self.data_file {
            Some(path) => FileStore::create(path)?,
            None => FileStore::temporary()?,
        };
        let cache = WriteBackCache::with_capacity(file, self.cache_capacity)?;
        let tree = BTree::new(cache, self.min_degree)?;

        tracing::info!(
            min_degree = self.min_degree,
            cache_capacity = self.cache_capacity,
            data_file = ?self.data_file,
            "opened B-tree"
        );
        Ok(tree)
    }
}

/// Parse `value` as a `usize` within `min..=max`.
fn parse_in_range(name: &str, value: &str, min: usize, max: usize) -> Result<usize, ConfigError> {
    let parsed = value.parse::<usize>().map_err(|_| ConfigError::InvalidValue {
        name: name.to_string(),
        message: format!("'{value}' is not a non-negative integer"),
    })?;
    if parsed < min {
        return Err(ConfigError::InvalidValue {
            name: name.to_string(),
            message: format!("must be at least {min}, got {parsed}"),
        });
    }
    if parsed > max {
        return Err(ConfigError::InvalidValue {
            name: name.to_string(),
            message: format!("must be at most {max}, got {parsed}"),
        });
    }
    Ok(parsed)
}
