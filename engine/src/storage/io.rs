//! Object storage abstraction.
//!
//! This module provides a `Storage` trait that abstracts over handle-based
//! object persistence, allowing the B-tree to run against an append-only file
//! in production and an in-memory log in tests, with an optional write-back
//! cache layered in front of either.
//!
//! # Design
//!
//! The trait is a minimal contract over three operations:
//! - `create`: persist a new object and hand out a fresh handle
//! - `update`: associate a new version of an object with an existing handle
//! - `load`: resolve a handle back into an object
//!
//! Handles are opaque. Resolving one is a fallible operation, never a free
//! dereference.

use crate::storage::record::DecodeError;

/// An opaque identifier for a stored object.
pub type Handle = u64;

/// Errors that can occur during storage operations.
#[derive(Debug)]
pub enum StorageError {
    /// I/O error reaching the backing medium.
    Io(std::io::Error),
    /// The handle was never handed out by this store.
    UnknownHandle(Handle),
    /// Stored bytes failed their checksum.
    ChecksumMismatch {
        handle: Handle,
        expected: u32,
        actual: u32,
    },
    /// Stored bytes were intact but could not be decoded.
    Decode { handle: Handle, source: DecodeError },
    /// A record frame was truncated or had an impossible length.
    CorruptFrame { handle: Handle, offset: u64 },
    /// Encoded record does not fit in a frame.
    RecordTooLarge(usize),
    /// File already exists.
    AlreadyExists(std::path::PathBuf),
    /// Cache capacity must be positive.
    ZeroCapacity,
}

impl StorageError {
    /// Whether the backing medium was reached but its content was unreadable.
    ///
    /// Callers use this to tell "could not reach storage" apart from
    /// "storage reached, content corrupt".
    #[must_use]
    pub const fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::ChecksumMismatch { .. } | Self::Decode { .. } | Self::CorruptFrame { .. }
        )
    }

    /// Whether the error means the handle does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::UnknownHandle(_))
    }
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::UnknownHandle(handle) => write!(f, "unknown handle {handle}"),
            Self::ChecksumMismatch {
                handle,
                expected,
                actual,
            } => write!(
                f,
                "checksum mismatch for handle {handle}: expected 0x{expected:08x}, got 0x{actual:08x}"
            ),
            Self::Decode { handle, source } => {
                write!(f, "failed to decode record for handle {handle}: {source}")
            }
            Self::CorruptFrame { handle, offset } => {
                write!(f, "corrupt record frame for handle {handle} at offset {offset}")
            }
            Self::RecordTooLarge(size) => {
                write!(f, "record too large: {size} bytes (max {})", u32::MAX)
            }
            Self::AlreadyExists(p) => write!(f, "file already exists: {}", p.display()),
            Self::ZeroCapacity => write!(f, "cache capacity must be positive"),
        }
    }
}

impl std::error::Error for StorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Decode { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for StorageError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Abstraction over handle-based object storage.
///
/// # Implementation Notes
///
/// Implementations must ensure:
/// - `create` never overwrites previously stored data
/// - handles are assigned monotonically and never reused
/// - `load` returns the last version passed to `create` or `update`
/// - `update` on a handle this store never produced is an `UnknownHandle` error
pub trait Storage<T> {
    /// Persist a new object and return its handle.
    fn create(&mut self, object: &T) -> Result<Handle, StorageError>;

    /// Associate a new version of an object with an existing handle.
    fn update(&mut self, object: &T, handle: Handle) -> Result<(), StorageError>;

    /// Load the object currently associated with a handle.
    fn load(&mut self, handle: Handle) -> Result<T, StorageError>;
}

impl<T, S: Storage<T> + ?Sized> Storage<T> for &mut S {
    fn create(&mut self, object: &T) -> Result<Handle, StorageError> {
        (**self).create(object)
    }

    fn update(&mut self, object: &T, handle: Handle) -> Result<(), StorageError> {
        (**self).update(object, handle)
    }

    fn load(&mut self, handle: Handle) -> Result<T, StorageError> {
        (**self).load(handle)
    }
}
