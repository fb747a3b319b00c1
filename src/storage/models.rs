//! Data models for signature storage.
//!
//! This module defines the core data structures used for:
//! - Directory signatures (directory mtime at last enumeration)
//! - File signatures (mtime and size of a tracked media file)
//! - The pair of maps persisted between runs

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Modification timestamp with nanosecond precision.
pub type Timestamp = DateTime<Utc>;

/// Directory path to the mtime recorded when it was last enumerated.
pub type DirectoryMap = BTreeMap<PathBuf, Timestamp>;

/// Media file path to its last observed signature.
pub type FileMap = BTreeMap<PathBuf, FileRecord>;

/// Convert a filesystem time into a [`Timestamp`] without losing precision.
#[must_use]
pub fn to_timestamp(time: SystemTime) -> Timestamp {
    DateTime::<Utc>::from(time)
}

/// Persisted form of a [`FileSignature`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    /// Modification time of the path itself (not a symlink target).
    pub mtime: Timestamp,
    /// Size in bytes of the path itself.
    pub size: u64,
}

/// Last time a directory's immediate contents were enumerated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySignature {
    /// Directory path as visited (may run through a symlink).
    pub path: PathBuf,
    /// Directory mtime, following links.
    pub mtime: Timestamp,
}

impl DirectorySignature {
    /// Read the current signature of a directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory metadata cannot be read.
    pub fn capture(path: &Path) -> std::io::Result<Self> {
        let mtime = std::fs::metadata(path)?.modified()?;
        Ok(Self {
            path: path.to_path_buf(),
            mtime: to_timestamp(mtime),
        })
    }
}

/// Observed state of a tracked media file.
///
/// Captured from the path's own metadata, so a symlinked file is identified
/// by the link and not by whatever it points to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSignature {
    pub path: PathBuf,
    pub mtime: Timestamp,
    pub size: u64,
}

impl FileSignature {
    /// Read the current signature of a file without following links.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata cannot be read.
    pub fn capture(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::symlink_metadata(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            mtime: to_timestamp(metadata.modified()?),
            size: metadata.len(),
        })
    }

    /// Persisted form of this signature.
    #[must_use]
    pub const fn record(&self) -> FileRecord {
        FileRecord {
            mtime: self.mtime,
            size: self.size,
        }
    }

    /// Whether this signature differs from a stored record.
    #[must_use]
    pub fn differs_from(&self, record: &FileRecord) -> bool {
        self.mtime != record.mtime || self.size != record.size
    }
}

/// The two signature maps that make up the persisted cache.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureMaps {
    pub directories: DirectoryMap,
    pub files: FileMap,
}

impl SignatureMaps {
    /// Create empty maps.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether both maps are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.directories.is_empty() && self.files.is_empty()
    }
}

/// Signature maps shared between scan workers.
///
/// Each map has its own lock so directory and file writes never wait on
/// each other.
#[derive(Debug, Default)]
pub struct SharedSignatures {
    directories: Mutex<DirectoryMap>,
    files: Mutex<FileMap>,
}

impl SharedSignatures {
    /// Wrap maps for shared access.
    #[must_use]
    pub fn new(maps: SignatureMaps) -> Self {
        Self {
            directories: Mutex::new(maps.directories),
            files: Mutex::new(maps.files),
        }
    }

    /// Stored mtime for a directory, if any.
    #[must_use]
    pub fn directory_mtime(&self, path: &Path) -> Option<Timestamp> {
        self.directories.lock().get(path).copied()
    }

    /// Record (or overwrite) a directory signature.
    pub fn record_directory(&self, signature: DirectorySignature) {
        self.directories
            .lock()
            .insert(signature.path, signature.mtime);
    }

    /// Drop a directory signature so the next run lists it again.
    pub fn forget_directory(&self, path: &Path) {
        self.directories.lock().remove(path);
    }

    /// Record (or overwrite) a file signature.
    pub fn record_file(&self, signature: &FileSignature) {
        self.files
            .lock()
            .insert(signature.path.clone(), signature.record());
    }

    /// Unwrap back into plain maps.
    #[must_use]
    pub fn into_inner(self) -> SignatureMaps {
        SignatureMaps {
            directories: self.directories.into_inner(),
            files: self.files.into_inner(),
        }
    }
}
