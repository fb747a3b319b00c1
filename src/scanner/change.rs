//! Change detection against the previous run's file signatures.

use std::path::{Path, PathBuf};

use super::threshold::TimeThreshold;
use crate::storage::{FileMap, FileSignature};

/// Source of live file signatures at filter time.
pub trait MetadataLookup {
    /// Read the current signature of `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the metadata cannot be read.
    fn signature(&self, path: &Path) -> std::io::Result<FileSignature>;
}

/// Reads signatures from the filesystem, without following links.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiveMetadata;

impl MetadataLookup for LiveMetadata {
    fn signature(&self, path: &Path) -> std::io::Result<FileSignature> {
        FileSignature::capture(path)
    }
}

impl<F> MetadataLookup for F
where
    F: Fn(&Path) -> std::io::Result<FileSignature>,
{
    fn signature(&self, path: &Path) -> std::io::Result<FileSignature> {
        self(path)
    }
}

/// Narrows a scan result to the files that need downstream work.
#[derive(Debug, Clone)]
pub struct ChangeFilter<'a, L> {
    lookup: L,
    prior: Option<&'a FileMap>,
    threshold: Option<TimeThreshold>,
}

impl<'a, L: MetadataLookup> ChangeFilter<'a, L> {
    /// Create a filter that keeps everything.
    pub const fn new(lookup: L) -> Self {
        Self {
            lookup,
            prior: None,
            threshold: None,
        }
    }

    /// Compare against the file signatures recorded before this scan.
    #[must_use]
    pub fn with_prior(mut self, prior: Option<&'a FileMap>) -> Self {
        self.prior = prior;
        self
    }

    /// Keep only files modified at or after the threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: Option<TimeThreshold>) -> Self {
        self.threshold = threshold;
        self
    }

    /// Whether the filter would keep every input unchanged.
    #[must_use]
    pub const fn is_pass_through(&self) -> bool {
        self.prior.is_none() && self.threshold.is_none()
    }

    /// Apply the filter, preserving order.
    #[must_use]
    pub fn apply(&self, files: &[PathBuf]) -> Vec<PathBuf> {
        if self.is_pass_through() {
            return files.to_vec();
        }

        let kept: Vec<PathBuf> = files.iter().filter(|p| self.keep(p)).cloned().collect();

        tracing::debug!(
            scanned = files.len(),
            kept = kept.len(),
            threshold = ?self.threshold.map(|t| t.cutoff()),
            "Change filter applied"
        );

        kept
    }

    fn keep(&self, path: &Path) -> bool {
        let live = match self.lookup.signature(path) {
            Ok(signature) => signature,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "File changed during scan, skipping");
                return false;
            }
        };

        if let Some(prior) = self.prior {
            let changed = prior
                .get(path)
                .map_or(true, |record| live.differs_from(record));
            if !changed {
                tracing::debug!(path = %path.display(), "File unchanged since last run");
                return false;
            }
        }

        self.threshold
            .map_or(true, |threshold| threshold.admits(live.mtime))
    }
}
