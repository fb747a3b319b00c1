//! subsift - incremental media scanner
//!
//! Entry point for the subsift command-line tool.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use clap::Parser;
use subsift::coordinator::{CacheMode, ScanCoordinator, ScanRequest};
use subsift::observability::{init_tracing, TracingConfig};
use subsift::prompt::{expand_path, Prompter};
use subsift::subtitles::{DownstreamProcessor, ProviderRegistry, SubtitleFetcher};
use subsift::{Config, Error, Result};

/// subsift - find new media files and fetch their subtitles
#[derive(Parser, Debug)]
#[command(name = "subsift")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Media folder to scan (asked for interactively when omitted)
    root: Option<String>,

    /// Cache mode: seed, use-cache or ignore-cache (asked for when omitted)
    #[arg(short, long, env = "SUBSIFT_MODE")]
    mode: Option<CacheMode>,

    /// Only report files modified within this range (e.g. 2m, 3h, 5d, 2w, all)
    #[arg(short, long, env = "SUBSIFT_SINCE")]
    since: Option<String>,

    /// Save the signature cache after an ignore-cache run
    #[arg(long)]
    refresh_cache: bool,

    /// Directory holding the signature cache files
    #[arg(short, long, env = "SUBSIFT_CACHE_DIR", default_value = "./.subsift")]
    cache_dir: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SUBSIFT_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, env = "SUBSIFT_LOG_JSON")]
    log_json: bool,

    /// Also append logs to this file
    #[arg(long, env = "SUBSIFT_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Number of scan worker threads
    #[arg(long, env = "SUBSIFT_THREADS")]
    threads: Option<usize>,

    /// Subtitle languages, in preference order.
    ///
    /// Only used when providers are registered; the binary ships none.
    #[arg(long, env = "SUBSIFT_LANGUAGES", value_delimiter = ',')]
    languages: Vec<String>,

    /// Subtitle providers, in query order.
    ///
    /// No providers are built into this binary, so it only lists files. The
    /// names select among providers registered through the library.
    #[arg(long, env = "SUBSIFT_PROVIDERS", value_delimiter = ',')]
    providers: Vec<String>,
}

impl Cli {
    fn config(&self) -> Config {
        let defaults = Config::default();
        Config {
            cache_dir: expand_path(&self.cache_dir),
            log_level: self.log_level.clone(),
            log_json: self.log_json,
            log_file: self.log_file.clone(),
            scan_threads: self.threads.unwrap_or(defaults.scan_threads),
            languages: if self.languages.is_empty() {
                defaults.languages
            } else {
                self.languages.clone()
            },
            providers: if self.providers.is_empty() {
                defaults.providers
            } else {
                self.providers.clone()
            },
        }
    }

    /// Fill in whatever the command line left out.
    fn request(self) -> Result<ScanRequest> {
        let (root, mode, since) = match (self.root, self.mode) {
            (Some(root), Some(mode)) => (expand_path(&root), mode, self.since),
            (root, mode) => {
                if !io::stdin().is_terminal() {
                    return Err(Error::config(
                        "folder path and --mode are required when stdin is not a terminal",
                    ));
                }
                let stdin = io::stdin();
                let mut prompter = Prompter::new(stdin.lock(), io::stderr());

                let root = match root {
                    Some(root) => expand_path(&root),
                    None => prompter.root()?,
                };
                let mode = match mode {
                    Some(mode) => mode,
                    None => prompter.mode()?,
                };
                let since = match self.since {
                    None if mode == CacheMode::IgnoreCache => prompter.time_filter()?,
                    since => since,
                };
                (root, mode, since)
            }
        };

        let mut request = ScanRequest::new(root, mode).with_persist(self.refresh_cache);
        if let Some(since) = since {
            request = request.with_time_filter(since);
        }
        Ok(request)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config();

    // Validate before tracing so a bad log level is reported plainly
    config.validate()?;
    init_tracing(&TracingConfig::from(&config))?;

    tracing::debug!(?config, "Configuration loaded");

    let coordinator = ScanCoordinator::from_config(&config)?;
    let request = cli.request()?;

    tracing::info!(
        "subsift v{} scanning {}",
        env!("CARGO_PKG_VERSION"),
        request.root.display()
    );

    let outcome = coordinator.run_async(request).await?;

    for warning in &outcome.warnings {
        tracing::warn!(%warning, "Run completed with warning");
    }

    let mut stdout = io::stdout().lock();
    for path in &outcome.files {
        writeln!(stdout, "{}", path.display())?;
    }
    stdout.flush()?;

    let fetcher = SubtitleFetcher::from_config(&config, &ProviderRegistry::new());
    if fetcher.has_providers() {
        let report = fetcher.process(&outcome.files);
        if !report.is_clean() {
            tracing::warn!(failures = report.failures.len(), "Some files were not processed");
        }
    } else if !outcome.files.is_empty() {
        tracing::info!(
            requested = ?config.providers,
            "No subtitle providers available, listing files only"
        );
    }

    tracing::info!(
        mode = %outcome.mode,
        files = outcome.files.len(),
        scanned = outcome.scanned,
        pruned = outcome.stats.directories_pruned,
        persisted = outcome.persisted,
        "Run complete"
    );

    Ok(())
}
