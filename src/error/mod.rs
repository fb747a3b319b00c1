//! Error types and Result aliases for subsift.
//!
//! This module defines the error hierarchy used throughout the crate.
//! Only [`Error::InvalidRoot`] and [`Error::Config`] abort a run; everything
//! else is logged by the component that hit it and the run degrades.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using subsift's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for subsift operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Scan root is missing or not a directory.
    #[error("invalid root '{}': not an existing directory", .0.display())]
    InvalidRoot(PathBuf),

    /// Signature cache error.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Directory traversal or filtering error.
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    /// Downstream subtitle processing error.
    #[error("subtitle error: {0}")]
    Subtitle(#[from] SubtitleError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Signature cache errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Cache document could not be read or parsed.
    #[error("failed to read cache '{path}': {reason}")]
    CacheRead { path: String, reason: String },

    /// Cache document could not be written.
    #[error("failed to write cache '{path}': {reason}")]
    CacheWrite { path: String, reason: String },

    /// A single record in a cache document has the wrong shape.
    #[error("malformed record for '{key}': {reason}")]
    MalformedRecord { key: String, reason: String },
}

/// Directory traversal errors.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Symbolic link whose target does not exist.
    #[error("broken symlink '{path}': {reason}")]
    BrokenLink { path: String, reason: String },

    /// Directory could not be enumerated.
    #[error("cannot read directory '{path}': {reason}")]
    DirectoryAccess { path: String, reason: String },

    /// Symlinked directory that points back at one of its ancestors.
    #[error("symlink cycle at '{path}' (target '{target}')")]
    SymlinkCycle { path: String, target: String },

    /// Time filter string that is not `<n><m|h|d|w>`.
    #[error("invalid time filter '{0}': expected e.g. 2m, 3h, 5d, 2w or 'all'")]
    InvalidTimeFilter(String),
}

/// Downstream subtitle errors.
#[derive(Error, Debug)]
pub enum SubtitleError {
    /// File name cannot be turned into a media identity.
    #[error("cannot parse media path '{path}': {reason}")]
    UnparseableMediaPath { path: String, reason: String },

    /// A subtitle provider failed.
    #[error("provider '{provider}' failed: {reason}")]
    Provider { provider: String, reason: String },

    /// Subtitle file could not be written.
    #[error("failed to write subtitle '{path}': {reason}")]
    Write { path: String, reason: String },
}

impl Error {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error aborts a run instead of degrading it.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_) | Self::InvalidRoot(_))
    }
}

impl StorageError {
    /// Create a cache read error.
    pub fn read(path: &std::path::Path, reason: impl ToString) -> Self {
        Self::CacheRead {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a cache write error.
    pub fn write(path: &std::path::Path, reason: impl ToString) -> Self {
        Self::CacheWrite {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl ScanError {
    /// Create a directory access error.
    pub fn directory_access(path: &std::path::Path, reason: impl ToString) -> Self {
        Self::DirectoryAccess {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a broken link error.
    pub fn broken_link(path: &std::path::Path, reason: impl ToString) -> Self {
        Self::BrokenLink {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl SubtitleError {
    /// Create an unparseable media path error.
    pub fn unparseable(path: &std::path::Path, reason: impl Into<String>) -> Self {
        Self::UnparseableMediaPath {
            path: path.display().to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests;
