//! Symlink-aware directory walker.
//!
//! Walks a media tree depth-first with `walkdir`, following links but keeping
//! the link path as each entry's identity. Directories whose mtime matches
//! the stored signature are not descended into. Media file signatures are
//! captured in parallel once the walk has listed them; results stay in
//! pre-order.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use walkdir::{DirEntry, WalkDir};

use super::filter::MediaFilter;
use crate::error::ScanError;
use crate::storage::{DirectorySignature, FileSignature, SharedSignatures};
use crate::{Error, Result};

/// Scan statistics.
#[derive(Debug, Default)]
pub struct ScanStats {
    pub directories_visited: AtomicU64,
    pub directories_pruned: AtomicU64,
    pub files_found: AtomicU64,
    pub broken_links: AtomicU64,
    pub errors: AtomicU64,
}

impl ScanStats {
    /// Create new stats.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of current stats.
    #[must_use]
    pub fn snapshot(&self) -> ScanStatsSnapshot {
        ScanStatsSnapshot {
            directories_visited: self.directories_visited.load(Ordering::Relaxed),
            directories_pruned: self.directories_pruned.load(Ordering::Relaxed),
            files_found: self.files_found.load(Ordering::Relaxed),
            broken_links: self.broken_links.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of scan stats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStatsSnapshot {
    pub directories_visited: u64,
    pub directories_pruned: u64,
    pub files_found: u64,
    pub broken_links: u64,
    pub errors: u64,
}

/// Media paths found by one scan, in depth-first pre-order.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub files: Vec<PathBuf>,
    pub stats: ScanStatsSnapshot,
}

/// Recursive media tree scanner.
///
/// Clone is cheap: the thread pool is shared.
#[derive(Clone)]
pub struct TreeScanner {
    filter: MediaFilter,
    pool: Arc<ThreadPool>,
}

impl TreeScanner {
    /// Create a scanner with `threads` signature workers.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread pool cannot be created.
    pub fn new(threads: usize) -> Result<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("scan-worker-{i}"))
            .build()
            .map_err(|e| Error::internal(format!("failed to build scan pool: {e}")))?;

        Ok(Self {
            filter: MediaFilter::new(),
            pool: Arc::new(pool),
        })
    }

    /// Number of worker threads.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Scan `root`, updating `signatures` as directories and files are seen.
    ///
    /// With `force_full` set, stored directory signatures are ignored and
    /// every directory is enumerated. Errors below the root are logged and
    /// skipped; the scan itself never fails.
    pub fn scan(&self, root: &Path, signatures: &SharedSignatures, force_full: bool) -> ScanResult {
        tracing::info!(root = %root.display(), force_full, "Starting directory scan");

        let stats = ScanStats::new();
        let walk = Walk {
            filter: &self.filter,
            signatures,
            stats: &stats,
            force_full,
        };

        let candidates = walk.candidates(root);
        let files = self.pool.install(|| {
            candidates
                .par_iter()
                .filter_map(|path| walk.record_file(path))
                .collect::<Vec<_>>()
        });

        let snapshot = stats.snapshot();
        tracing::info!(
            root = %root.display(),
            found = snapshot.files_found,
            visited = snapshot.directories_visited,
            pruned = snapshot.directories_pruned,
            broken_links = snapshot.broken_links,
            errors = snapshot.errors,
            "Directory scan complete"
        );

        ScanResult {
            files,
            stats: snapshot,
        }
    }
}

impl std::fmt::Debug for TreeScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeScanner")
            .field("filter", &self.filter)
            .field("threads", &self.threads())
            .finish()
    }
}

/// State shared by one scan.
struct Walk<'a> {
    filter: &'a MediaFilter,
    signatures: &'a SharedSignatures,
    stats: &'a ScanStats,
    force_full: bool,
}

impl Walk<'_> {
    /// Walk the tree and list media paths in pre-order.
    ///
    /// A directory that cannot be read is reported and contributes nothing;
    /// its siblings are still walked.
    fn candidates(&self, root: &Path) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let mut entries = WalkDir::new(root)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter();

        while let Some(next) = entries.next() {
            let entry = match next {
                Ok(entry) => entry,
                Err(e) => {
                    let error = walk_error(&e);
                    // A directory that could not be listed must not be pruned
                    // next time.
                    if let (ScanError::DirectoryAccess { .. }, Some(dir)) = (&error, e.path()) {
                        self.signatures.forget_directory(dir);
                    }
                    self.report(&error);
                    continue;
                }
            };

            if entry.path_is_symlink() {
                log_link(&entry);
            }

            if entry.file_type().is_dir() {
                if !self.enter_directory(&entry) {
                    entries.skip_current_dir();
                }
            } else if entry.file_type().is_file() && self.filter.is_media(entry.path()) {
                found.push(entry.into_path());
            }
        }

        found
    }

    /// Check the mtime gate and record the directory; false means prune.
    fn enter_directory(&self, entry: &DirEntry) -> bool {
        let dir = entry.path();
        let current = match DirectorySignature::capture(dir) {
            Ok(signature) => signature,
            Err(e) => {
                self.report(&ScanError::directory_access(dir, e));
                return false;
            }
        };

        if !self.force_full && self.signatures.directory_mtime(dir) == Some(current.mtime) {
            self.stats.directories_pruned.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(dir = %dir.display(), "Skipping unchanged directory");
            return false;
        }

        self.signatures.record_directory(current);
        self.stats
            .directories_visited
            .fetch_add(1, Ordering::Relaxed);
        true
    }

    /// Capture and store the signature of the path itself, so a linked file
    /// is tracked at the link location.
    fn record_file(&self, path: &Path) -> Option<PathBuf> {
        match FileSignature::capture(path) {
            Ok(signature) => {
                self.signatures.record_file(&signature);
                self.stats.files_found.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    path = %path.display(),
                    size = signature.size,
                    container = MediaFilter::container_name(path).unwrap_or("other"),
                    "Found media file"
                );
                Some(path.to_path_buf())
            }
            Err(e) => {
                self.report(&ScanError::directory_access(path, e));
                None
            }
        }
    }

    fn report(&self, error: &ScanError) {
        match error {
            ScanError::BrokenLink { .. } => {
                self.stats.broken_links.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %error, "Skipping broken symlink");
            }
            ScanError::SymlinkCycle { .. } => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %error, "Not following symlink cycle");
            }
            _ => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                tracing::error!(error = %error, "Error scanning directory");
            }
        }
    }
}

/// Map a walk error onto the scan error taxonomy.
fn walk_error(error: &walkdir::Error) -> ScanError {
    let path = error.path().unwrap_or_else(|| Path::new(""));

    if let Some(ancestor) = error.loop_ancestor() {
        return ScanError::SymlinkCycle {
            path: path.display().to_string(),
            target: ancestor.display().to_string(),
        };
    }

    // With links followed, a dangling link fails on its target's metadata.
    let dangling = error.io_error().is_some()
        && std::fs::symlink_metadata(path).is_ok_and(|m| m.file_type().is_symlink())
        && std::fs::metadata(path).is_err();
    if dangling {
        ScanError::broken_link(path, error)
    } else {
        ScanError::directory_access(path, error)
    }
}

fn log_link(entry: &DirEntry) {
    if let Ok(target) = std::fs::read_link(entry.path()) {
        tracing::info!(link = %entry.path().display(), target = %target.display(), "Detected symlink");
    }
}
