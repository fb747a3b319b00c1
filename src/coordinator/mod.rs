//! Scan run orchestration.
//!
//! A run is one of three modes:
//! - `Seed`: record every directory and file, emit nothing
//! - `UseCache`: prune unchanged directories, emit new or changed files
//! - `IgnoreCache`: rescan everything from empty maps, optionally narrowed
//!   by a time filter and only persisted on request
//!
//! The run moves through [`ScanPhase`]s; each transition is logged and
//! recorded in the outcome.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error as ThisError;

use crate::config::Config;
use crate::error::ScanError;
use crate::observability::spans;
use crate::scanner::{
    ChangeFilter, LiveMetadata, ScanStatsSnapshot, TimeThreshold, TreeScanner,
};
use crate::storage::{SharedSignatures, SignatureMaps, SignatureStore};
use crate::{Error, Result};

/// How stored signatures are used by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheMode {
    /// Populate the store from a full scan and emit nothing.
    Seed,
    /// Consult the store and emit only new or changed files.
    UseCache,
    /// Ignore the store and emit every file found.
    IgnoreCache,
}

impl CacheMode {
    /// Stable name used on the command line and in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::UseCache => "use-cache",
            Self::IgnoreCache => "ignore-cache",
        }
    }
}

impl fmt::Display for CacheMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CacheMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "seed" | "init" => Ok(Self::Seed),
            "use-cache" | "cache" => Ok(Self::UseCache),
            "ignore-cache" | "ignore" | "full" => Ok(Self::IgnoreCache),
            other => Err(Error::config(format!(
                "unknown cache mode '{other}', expected seed, use-cache or ignore-cache"
            ))),
        }
    }
}

/// Phases of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanPhase {
    Seeding,
    Scanning,
    Filtering,
    Persisting,
    Done,
}

/// Parameters of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanRequest {
    /// Directory to scan; must exist.
    pub root: PathBuf,
    /// Cache mode.
    pub mode: CacheMode,
    /// Time filter such as `3h`; only honored in `IgnoreCache` mode.
    pub time_filter: Option<String>,
    /// Save the maps after an `IgnoreCache` run. Other modes always save.
    pub persist: bool,
}

impl ScanRequest {
    /// Create a request with no time filter.
    pub fn new(root: impl Into<PathBuf>, mode: CacheMode) -> Self {
        Self {
            root: root.into(),
            mode,
            time_filter: None,
            persist: false,
        }
    }

    /// Set the time filter.
    #[must_use]
    pub fn with_time_filter(mut self, filter: impl Into<String>) -> Self {
        self.time_filter = Some(filter.into());
        self
    }

    /// Persist the maps even in `IgnoreCache` mode.
    #[must_use]
    pub const fn with_persist(mut self, persist: bool) -> Self {
        self.persist = persist;
        self
    }

    const fn saves(&self) -> bool {
        match self.mode {
            CacheMode::Seed | CacheMode::UseCache => true,
            CacheMode::IgnoreCache => self.persist,
        }
    }
}

/// Recoverable problems surfaced to the caller.
#[derive(ThisError, Debug)]
pub enum RunWarning {
    /// The time filter could not be parsed; no cutoff was applied.
    #[error("{0}; no time filter applied")]
    InvalidTimeFilter(ScanError),

    /// A time filter was given for a mode that does not use one.
    #[error("time filter ignored in {0} mode")]
    TimeFilterIgnored(CacheMode),

    /// The maps could not be saved; the previous cache is still on disk.
    #[error("signature cache not saved: {0}")]
    CacheNotSaved(String),
}

/// Result of a completed run.
#[derive(Debug)]
pub struct ScanOutcome {
    pub mode: CacheMode,
    /// Files needing downstream processing, in scan order.
    pub files: Vec<PathBuf>,
    /// Number of media files the walk produced before filtering.
    pub scanned: usize,
    pub stats: ScanStatsSnapshot,
    /// Whether both cache documents were written.
    pub persisted: bool,
    /// Phases entered, in order.
    pub phases: Vec<ScanPhase>,
    pub warnings: Vec<RunWarning>,
}

/// Book-keeping for one run.
struct RunState {
    phases: Vec<ScanPhase>,
    warnings: Vec<RunWarning>,
    persisted: bool,
}

impl RunState {
    fn start(phase: ScanPhase) -> Self {
        tracing::debug!(phase = ?phase, "Entering phase");
        Self {
            phases: vec![phase],
            warnings: Vec::new(),
            persisted: false,
        }
    }

    fn enter(&mut self, phase: ScanPhase) {
        tracing::debug!(from = ?self.phases.last(), to = ?phase, "Entering phase");
        self.phases.push(phase);
    }

    fn finish(
        mut self,
        mode: CacheMode,
        files: Vec<PathBuf>,
        scanned: usize,
        stats: ScanStatsSnapshot,
    ) -> ScanOutcome {
        self.enter(ScanPhase::Done);
        ScanOutcome {
            mode,
            files,
            scanned,
            stats,
            persisted: self.persisted,
            phases: self.phases,
            warnings: self.warnings,
        }
    }
}

/// Runs scans against one signature store.
///
/// Clone is cheap; clones share the scanner's thread pool.
#[derive(Debug, Clone)]
pub struct ScanCoordinator {
    store: SignatureStore,
    scanner: TreeScanner,
}

impl ScanCoordinator {
    /// Create a coordinator from its parts.
    #[must_use]
    pub const fn new(store: SignatureStore, scanner: TreeScanner) -> Self {
        Self { store, scanner }
    }

    /// Create a coordinator from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the scanner
    /// cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        let scanner = TreeScanner::new(config.scan_threads)?;
        Ok(Self::new(SignatureStore::from_config(config), scanner))
    }

    /// The backing store.
    #[must_use]
    pub const fn store(&self) -> &SignatureStore {
        &self.store
    }

    /// Execute one run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRoot`] if the root is not an existing
    /// directory; nothing is loaded, scanned or saved in that case. All
    /// other problems are logged and reported through
    /// [`ScanOutcome::warnings`] or the scan stats.
    pub fn run(&self, request: &ScanRequest) -> Result<ScanOutcome> {
        if !request.root.is_dir() {
            tracing::error!(root = %request.root.display(), "Invalid folder path");
            return Err(Error::InvalidRoot(request.root.clone()));
        }

        let root = absolute_root(&request.root)?;
        let span = spans::run_span(request.mode.as_str(), &root);
        let _guard = span.enter();

        match request.mode {
            CacheMode::Seed => Ok(self.seed(&root)),
            CacheMode::UseCache | CacheMode::IgnoreCache => Ok(self.scan(request, &root)),
        }
    }

    /// Execute one run on the blocking thread pool.
    ///
    /// # Errors
    ///
    /// Same as [`run`](Self::run), plus an internal error if the task panics.
    pub async fn run_async(&self, request: ScanRequest) -> Result<ScanOutcome> {
        let coordinator = self.clone();
        tokio::task::spawn_blocking(move || coordinator.run(&request))
            .await
            .map_err(|e| Error::internal(format!("scan task failed: {e}")))?
    }

    fn seed(&self, root: &Path) -> ScanOutcome {
        tracing::info!("Initializing cache: recording all current files and folders");
        let mut state = RunState::start(ScanPhase::Seeding);

        let shared = SharedSignatures::new(self.store.load());
        let result = self.scanner.scan(root, &shared, true);
        self.persist(&mut state, &shared.into_inner());

        tracing::info!(
            files = result.files.len(),
            "Cache initialization complete, future runs will process only new files"
        );

        state.finish(CacheMode::Seed, Vec::new(), result.files.len(), result.stats)
    }

    fn scan(&self, request: &ScanRequest, root: &Path) -> ScanOutcome {
        let mut state = RunState::start(ScanPhase::Scanning);
        let threshold = resolve_threshold(request, &mut state.warnings);

        let (maps, prior) = match request.mode {
            CacheMode::UseCache => {
                tracing::info!("Using cache mode");
                let maps = self.store.load();
                let prior = maps.files.clone();
                (maps, Some(prior))
            }
            _ => {
                tracing::info!(
                    threshold = ?threshold.map(|t| t.cutoff()),
                    "Ignore cache mode"
                );
                (SignatureMaps::new(), None)
            }
        };
        let force_full = prior.is_none();

        let shared = SharedSignatures::new(maps);
        let result = self.scanner.scan(root, &shared, force_full);
        let scanned = result.files.len();

        let filter = ChangeFilter::new(LiveMetadata)
            .with_prior(prior.as_ref())
            .with_threshold(threshold);
        let files = if filter.is_pass_through() {
            result.files
        } else {
            state.enter(ScanPhase::Filtering);
            filter.apply(&result.files)
        };

        if request.saves() {
            self.persist(&mut state, &shared.into_inner());
        } else {
            tracing::debug!("Ephemeral run, signature cache left untouched");
        }

        tracing::info!(files = files.len(), scanned, "Found files to process");

        state.finish(request.mode, files, scanned, result.stats)
    }

    fn persist(&self, state: &mut RunState, maps: &SignatureMaps) {
        state.enter(ScanPhase::Persisting);
        match self.store.save(maps) {
            Ok(()) => state.persisted = true,
            Err(e) => state.warnings.push(RunWarning::CacheNotSaved(e.to_string())),
        }
    }
}

/// Anchor a relative root at the working directory so stored keys are the
/// same wherever the run starts. Links are left as typed.
fn absolute_root(root: &Path) -> Result<PathBuf> {
    let joined = if root.is_absolute() {
        root.to_path_buf()
    } else {
        std::env::current_dir()?.join(root)
    };
    Ok(joined.components().collect())
}

fn resolve_threshold(request: &ScanRequest, warnings: &mut Vec<RunWarning>) -> Option<TimeThreshold> {
    let text = request.time_filter.as_deref()?;

    if request.mode != CacheMode::IgnoreCache {
        tracing::warn!(filter = %text, mode = %request.mode, "Time filter only applies when ignoring the cache");
        warnings.push(RunWarning::TimeFilterIgnored(request.mode));
        return None;
    }

    match TimeThreshold::parse(text) {
        Ok(threshold) => threshold,
        Err(e) => {
            tracing::warn!(error = %e, "Invalid time format, no time filter applied");
            warnings.push(RunWarning::InvalidTimeFilter(e));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn coordinator(cache: &Path) -> ScanCoordinator {
        ScanCoordinator::new(SignatureStore::in_dir(cache), TreeScanner::new(2).unwrap())
    }

    #[test]
    fn test_cache_mode_from_str() {
        assert_eq!("seed".parse::<CacheMode>().unwrap(), CacheMode::Seed);
        assert_eq!("Use-Cache".parse::<CacheMode>().unwrap(), CacheMode::UseCache);
        assert_eq!(
            "ignore-cache".parse::<CacheMode>().unwrap(),
            CacheMode::IgnoreCache
        );
        assert!("sometimes".parse::<CacheMode>().is_err());
        assert_eq!(CacheMode::IgnoreCache.to_string(), "ignore-cache");
    }

    #[test]
    fn test_request_saves() {
        assert!(ScanRequest::new("/m", CacheMode::Seed).saves());
        assert!(ScanRequest::new("/m", CacheMode::UseCache).saves());
        assert!(!ScanRequest::new("/m", CacheMode::IgnoreCache).saves());
        assert!(ScanRequest::new("/m", CacheMode::IgnoreCache)
            .with_persist(true)
            .saves());
    }

    #[test]
    fn test_invalid_root() {
        let cache = TempDir::new().unwrap();
        let media = TempDir::new().unwrap();
        let file = media.path().join("a.mkv");
        fs::write(&file, "x").unwrap();

        let coordinator = coordinator(cache.path());
        for root in [media.path().join("missing"), file] {
            let err = coordinator
                .run(&ScanRequest::new(&root, CacheMode::UseCache))
                .unwrap_err();
            assert!(matches!(err, Error::InvalidRoot(ref p) if *p == root));
        }
        assert!(!coordinator.store().dir_cache_path().exists());
    }

    #[test]
    fn test_absolute_root() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(absolute_root(Path::new("media")).unwrap(), cwd.join("media"));
        assert_eq!(
            absolute_root(Path::new("./media/./shows/")).unwrap(),
            cwd.join("media").join("shows")
        );

        let tmp = TempDir::new().unwrap();
        assert_eq!(absolute_root(tmp.path()).unwrap(), tmp.path());
    }

    #[test]
    fn test_seed_phases() {
        let cache = TempDir::new().unwrap();
        let media = TempDir::new().unwrap();
        fs::write(media.path().join("a.mkv"), "x").unwrap();

        let outcome = coordinator(cache.path())
            .run(&ScanRequest::new(media.path(), CacheMode::Seed))
            .unwrap();

        assert!(outcome.files.is_empty());
        assert_eq!(outcome.scanned, 1);
        assert!(outcome.persisted);
        assert_eq!(
            outcome.phases,
            vec![ScanPhase::Seeding, ScanPhase::Persisting, ScanPhase::Done]
        );
    }

    #[test]
    fn test_use_cache_phases() {
        let cache = TempDir::new().unwrap();
        let media = TempDir::new().unwrap();
        fs::write(media.path().join("a.mkv"), "x").unwrap();

        let outcome = coordinator(cache.path())
            .run(&ScanRequest::new(media.path(), CacheMode::UseCache))
            .unwrap();

        assert_eq!(outcome.files, vec![media.path().join("a.mkv")]);
        assert_eq!(
            outcome.phases,
            vec![
                ScanPhase::Scanning,
                ScanPhase::Filtering,
                ScanPhase::Persisting,
                ScanPhase::Done
            ]
        );
    }

    #[test]
    fn test_ignore_cache_is_ephemeral() {
        let cache = TempDir::new().unwrap();
        let media = TempDir::new().unwrap();
        fs::write(media.path().join("a.mkv"), "x").unwrap();

        let outcome = coordinator(cache.path())
            .run(&ScanRequest::new(media.path(), CacheMode::IgnoreCache))
            .unwrap();

        assert_eq!(outcome.files.len(), 1);
        assert!(!outcome.persisted);
        assert_eq!(outcome.phases, vec![ScanPhase::Scanning, ScanPhase::Done]);
        assert!(!cache.path().join("scan_cache.json").exists());
    }

    #[test]
    fn test_ignore_cache_with_persist() {
        let cache = TempDir::new().unwrap();
        let media = TempDir::new().unwrap();
        fs::write(media.path().join("a.mkv"), "x").unwrap();

        let coordinator = coordinator(cache.path());
        let outcome = coordinator
            .run(&ScanRequest::new(media.path(), CacheMode::IgnoreCache).with_persist(true))
            .unwrap();

        assert!(outcome.persisted);
        assert_eq!(coordinator.store().load().files.len(), 1);
    }

    #[test]
    fn test_time_filter_ignored_outside_ignore_cache() {
        let cache = TempDir::new().unwrap();
        let media = TempDir::new().unwrap();

        let outcome = coordinator(cache.path())
            .run(&ScanRequest::new(media.path(), CacheMode::UseCache).with_time_filter("2h"))
            .unwrap();

        assert!(matches!(
            outcome.warnings.as_slice(),
            [RunWarning::TimeFilterIgnored(CacheMode::UseCache)]
        ));
    }

    #[test]
    fn test_invalid_time_filter_warns() {
        let cache = TempDir::new().unwrap();
        let media = TempDir::new().unwrap();
        fs::write(media.path().join("a.mkv"), "x").unwrap();

        let outcome = coordinator(cache.path())
            .run(&ScanRequest::new(media.path(), CacheMode::IgnoreCache).with_time_filter("xyz"))
            .unwrap();

        assert_eq!(outcome.files.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].to_string().contains("no time filter applied"));
    }

    #[test]
    fn test_save_failure_is_a_warning() {
        let media = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        // Cache "directory" is a regular file.
        let blocker = cache.path().join("blocked");
        fs::write(&blocker, "x").unwrap();

        let outcome = coordinator(&blocker)
            .run(&ScanRequest::new(media.path(), CacheMode::Seed))
            .unwrap();

        assert!(!outcome.persisted);
        assert!(matches!(
            outcome.warnings.as_slice(),
            [RunWarning::CacheNotSaved(_)]
        ));
    }

    #[tokio::test]
    async fn test_run_async() {
        let cache = TempDir::new().unwrap();
        let media = TempDir::new().unwrap();
        fs::write(media.path().join("a.mp4"), "x").unwrap();

        let outcome = coordinator(cache.path())
            .run_async(ScanRequest::new(media.path(), CacheMode::IgnoreCache))
            .await
            .unwrap();

        assert_eq!(outcome.files.len(), 1);
    }
}
