//! JSON-backed signature store.
//!
//! Two documents, one per map. Loading never fails: anything unreadable is a
//! cold start. Saving replaces each document with a single rename, so a
//! crashed run leaves the previous file in place.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use super::models::SignatureMaps;
use crate::config::{Config, DIR_CACHE_FILENAME, FILE_CACHE_FILENAME};
use crate::error::StorageError;

/// Handle on the two persisted cache documents.
#[derive(Debug, Clone)]
pub struct SignatureStore {
    dir_cache: PathBuf,
    file_cache: PathBuf,
}

impl SignatureStore {
    /// Create a store backed by the given documents.
    pub fn new(dir_cache: impl Into<PathBuf>, file_cache: impl Into<PathBuf>) -> Self {
        Self {
            dir_cache: dir_cache.into(),
            file_cache: file_cache.into(),
        }
    }

    /// Create a store using the default file names inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(DIR_CACHE_FILENAME), dir.join(FILE_CACHE_FILENAME))
    }

    /// Create a store from configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.dir_cache_path(), config.file_cache_path())
    }

    /// Path of the directory-signature document.
    #[must_use]
    pub fn dir_cache_path(&self) -> &Path {
        &self.dir_cache
    }

    /// Path of the file-signature document.
    #[must_use]
    pub fn file_cache_path(&self) -> &Path {
        &self.file_cache
    }

    /// Load both maps.
    ///
    /// A missing, unreadable or corrupt document yields an empty map and a
    /// log line. Individual malformed records are dropped.
    #[must_use]
    pub fn load(&self) -> SignatureMaps {
        let maps = SignatureMaps {
            directories: load_document(&self.dir_cache),
            files: load_document(&self.file_cache),
        };

        tracing::debug!(
            directories = maps.directories.len(),
            files = maps.files.len(),
            "Signature cache loaded"
        );

        maps
    }

    /// Save both maps.
    ///
    /// Each document is written independently; a failure on one does not
    /// stop the other. Failures are logged here, and the on-disk document
    /// that failed keeps its previous contents.
    ///
    /// # Errors
    ///
    /// Returns the first write failure, for reporting.
    pub fn save(&self, maps: &SignatureMaps) -> std::result::Result<(), StorageError> {
        let dirs = write_document(&self.dir_cache, &maps.directories);
        let files = write_document(&self.file_cache, &maps.files);

        if dirs.is_ok() && files.is_ok() {
            tracing::debug!(
                directories = maps.directories.len(),
                files = maps.files.len(),
                "Signature cache saved"
            );
        }

        dirs.and(files)
    }
}

fn load_document<V: DeserializeOwned>(path: &Path) -> BTreeMap<PathBuf, V> {
    match read_document(path) {
        Ok(Some(doc)) => parse_records(path, doc),
        Ok(None) => {
            tracing::debug!(cache = %path.display(), "No cache file, starting cold");
            BTreeMap::new()
        }
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring unreadable cache, starting cold");
            BTreeMap::new()
        }
    }
}

fn read_document(path: &Path) -> std::result::Result<Option<Map<String, Value>>, StorageError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::read(path, e)),
    };

    match serde_json::from_str(&text).map_err(|e| StorageError::read(path, e))? {
        Value::Object(doc) => Ok(Some(doc)),
        other => Err(StorageError::read(
            path,
            format!("expected a JSON object, found {}", value_kind(&other)),
        )),
    }
}

fn parse_records<V: DeserializeOwned>(path: &Path, doc: Map<String, Value>) -> BTreeMap<PathBuf, V> {
    let mut records = BTreeMap::new();

    for (key, value) in doc {
        match serde_json::from_value::<V>(value) {
            Ok(record) => match decode_key(&key) {
                Ok(path) => {
                    records.insert(path, record);
                }
                Err(reason) => {
                    let err = StorageError::MalformedRecord { key, reason };
                    tracing::warn!(cache = %path.display(), error = %err, "Dropping cache record");
                }
            },
            Err(e) => {
                let err = StorageError::MalformedRecord {
                    key,
                    reason: e.to_string(),
                };
                tracing::warn!(cache = %path.display(), error = %err, "Dropping cache record");
            }
        }
    }

    records
}

fn write_document<V: Serialize>(
    path: &Path,
    records: &BTreeMap<PathBuf, V>,
) -> std::result::Result<(), StorageError> {
    let result = try_write_document(path, records);
    if let Err(ref e) = result {
        tracing::error!(error = %e, "Cache not saved, previous contents kept");
    }
    result
}

fn try_write_document<V: Serialize>(
    path: &Path,
    records: &BTreeMap<PathBuf, V>,
) -> std::result::Result<(), StorageError> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| StorageError::write(path, e))?;

    let mut encoded = BTreeMap::new();
    for (key, record) in records {
        match encode_key(key) {
            Some(text) => {
                encoded.insert(text, record);
            }
            None => {
                let err = StorageError::MalformedRecord {
                    key: key.display().to_string(),
                    reason: "path is not valid UTF-8".to_string(),
                };
                tracing::warn!(cache = %path.display(), error = %err, "Dropping cache record");
            }
        }
    }

    // Serialize fully before touching the filesystem.
    let mut bytes = serde_json::to_vec_pretty(&encoded).map_err(|e| StorageError::write(path, e))?;
    bytes.push(b'\n');

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| StorageError::write(path, e))?;
    tmp.write_all(&bytes)
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| StorageError::write(path, e))?;
    tmp.persist(path)
        .map_err(|e| StorageError::write(path, e.error))?;

    Ok(())
}

/// Marks a key holding the raw bytes of a path that is not UTF-8. NUL never
/// occurs in a real path, so plain keys cannot collide with it.
const RAW_KEY_MARKER: char = '\0';

/// Document key for a path: the path itself when it is UTF-8, otherwise the
/// marker followed by its bytes as a JSON array.
fn encode_key(path: &Path) -> Option<String> {
    if let Some(text) = path.to_str() {
        return Some(text.to_owned());
    }

    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStrExt;
        serde_json::to_string(path.as_os_str().as_bytes())
            .ok()
            .map(|bytes| format!("{RAW_KEY_MARKER}{bytes}"))
    }
    #[cfg(not(unix))]
    {
        None
    }
}

fn decode_key(key: &str) -> std::result::Result<PathBuf, String> {
    let Some(raw) = key.strip_prefix(RAW_KEY_MARKER) else {
        return Ok(PathBuf::from(key));
    };

    #[cfg(unix)]
    {
        use std::os::unix::ffi::OsStringExt;
        serde_json::from_str::<Vec<u8>>(raw)
            .map(|bytes| PathBuf::from(std::ffi::OsString::from_vec(bytes)))
            .map_err(|e| format!("bad raw path bytes: {e}"))
    }
    #[cfg(not(unix))]
    {
        let _ = raw;
        Err("raw path bytes are only readable on unix".to_string())
    }
}

const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
