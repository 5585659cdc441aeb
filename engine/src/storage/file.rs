//! Append-only file object store.
//!
//! Every `create` and `update` appends a new framed record to the end of a
//! single data file. Nothing is ever overwritten in place: an `update` writes
//! the new version and repoints the handle at it, leaving the previous bytes
//! as unreachable garbage.
//!
//! # Record Frame
//!
//! ```text
//! +----------+--------------------------------------------------+
//! | 0-3      | payload_length (4 bytes, little endian)          |
//! | 4-N      | payload (encoded record)                         |
//! | N-N+3    | CRC32 checksum of length + payload (4 bytes)     |
//! +----------+--------------------------------------------------+
//! ```
//!
//! # Handles
//!
//! A handle is the byte offset at which the first version of a record
//! begins. The handle -> current offset table lives in memory only, so a data
//! file cannot be reopened once its store is dropped.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use crate::storage::io::{Handle, Storage, StorageError};
use crate::storage::record::Record;

/// Frame length prefix size.
const LENGTH_SIZE: usize = 4;

/// CRC32 checksum size at end of frame.
const CHECKSUM_SIZE: usize = 4;

/// Total framing overhead per record.
const FRAME_OVERHEAD: u64 = (LENGTH_SIZE + CHECKSUM_SIZE) as u64;

/// An append-only store backed by a single data file.
pub struct FileStore<T> {
    file: File,
    /// Path of the data file, `None` for anonymous temp files.
    path: Option<PathBuf>,
    /// Offset one past the last written byte.
    /// Invariant: every offset in `table` is < `end`.
    end: u64,
    /// Handle -> offset of the current version.
    table: HashMap<Handle, u64>,
    _record: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for FileStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("path", &self.path)
            .field("end", &self.end)
            .field("handles", &self.table.len())
            .finish_non_exhaustive()
    }
}

impl<T: Record> FileStore<T> {
    /// Create a new store with a fresh data file at the given path.
    ///
    /// Returns an error if the file already exists.
    pub fn create(path: &Path) -> Result<Self, StorageError> {
        if path.exists() {
            return Err(StorageError::AlreadyExists(path.to_path_buf()));
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        tracing::info!("created file store at {}", path.display());

        Ok(Self::from_file(file, Some(path.to_path_buf())))
    }

    /// Create a new store backed by an anonymous temporary file.
    ///
    /// The file is removed by the OS once the store is dropped.
    pub fn temporary() -> Result<Self, StorageError> {
        let file = tempfile::tempfile()?;
        tracing::debug!("created temporary file store");
        Ok(Self::from_file(file, None))
    }

    fn from_file(file: File, path: Option<PathBuf>) -> Self {
        Self {
            file,
            path,
            end: 0,
            table: HashMap::new(),
            _record: PhantomData,
        }
    }

    /// Path of the data file, if it has one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Number of handles handed out.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether no handle has been handed out yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Total bytes written, including superseded versions.
    #[must_use]
    pub const fn file_size(&self) -> u64 {
        self.end
    }

    /// Sync all pending writes to disk.
    pub fn sync(&self) -> Result<(), StorageError> {
        self.file.sync_all().map_err(StorageError::Io)
    }

    /// Append a framed record at the end of the file.
    ///
    /// Returns the offset the frame starts at.
    fn append(&mut self, object: &T) -> Result<u64, StorageError> {
        let payload = object.encode();
        let payload_len =
            u32::try_from(payload.len()).map_err(|_| StorageError::RecordTooLarge(payload.len()))?;

        let mut frame = Vec::with_capacity(LENGTH_SIZE + payload.len() + CHECKSUM_SIZE);
        frame.extend_from_slice(&payload_len.to_le_bytes());
        frame.extend_from_slice(&payload);
        let checksum = crc32fast::hash(&frame);
        frame.extend_from_slice(&checksum.to_le_bytes());

        let offset = self.end;
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&frame)?;
        self.end = offset + frame.len() as u64;

        tracing::trace!(offset, len = frame.len(), "appended record");
        Ok(offset)
    }

    /// Read and verify the frame at `offset`.
    fn read_frame(&mut self, handle: Handle, offset: u64) -> Result<Vec<u8>, StorageError> {
        if offset + FRAME_OVERHEAD > self.end {
            return Err(StorageError::CorruptFrame { handle, offset });
        }

        self.file.seek(SeekFrom::Start(offset))?;
        let mut length_bytes = [0u8; LENGTH_SIZE];
        self.file.read_exact(&mut length_bytes)?;
        let payload_len = u64::from(u32::from_le_bytes(length_bytes));

        if offset + FRAME_OVERHEAD + payload_len > self.end {
            return Err(StorageError::CorruptFrame { handle, offset });
        }

        let payload_len =
            usize::try_from(payload_len).map_err(|_| StorageError::CorruptFrame { handle, offset })?;
        let mut rest = vec![0u8; payload_len + CHECKSUM_SIZE];
        self.file.read_exact(&mut rest)?;

        let (payload, checksum_bytes) = rest.split_at(payload_len);
        let stored_checksum = u32::from_le_bytes([
            checksum_bytes[0],
            checksum_bytes[1],
            checksum_bytes[2],
            checksum_bytes[3],
        ]);

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&length_bytes);
        hasher.update(payload);
        let computed_checksum = hasher.finalize();

        if stored_checksum != computed_checksum {
            return Err(StorageError::ChecksumMismatch {
                handle,
                expected: stored_checksum,
                actual: computed_checksum,
            });
        }

        rest.truncate(payload_len);
        Ok(rest)
    }
}

impl<T: Record> Storage<T> for FileStore<T> {
    fn create(&mut self, object: &T) -> Result<Handle, StorageError> {
        let offset = self.append(object)?;
        // The first version's offset doubles as the handle.
        let handle = offset;
        self.table.insert(handle, offset);
        Ok(handle)
    }

    fn update(&mut self, object: &T, handle: Handle) -> Result<(), StorageError> {
        if !self.table.contains_key(&handle) {
            return Err(StorageError::UnknownHandle(handle));
        }
        let offset = self.append(object)?;
        self.table.insert(handle, offset);
        Ok(())
    }

    fn load(&mut self, handle: Handle) -> Result<T, StorageError> {
        let offset = *self
            .table
            .get(&handle)
            .ok_or(StorageError::UnknownHandle(handle))?;
        let payload = self.read_frame(handle, offset)?;
        T::decode(&payload).map_err(|source| StorageError::Decode { handle, source })
    }
}
