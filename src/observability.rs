//! Structured logging and tracing configuration.
//!
//! Provides setup for observability using the `tracing` crate with:
//! - Plain text or JSON output on stderr (stdout carries the file list)
//! - An optional log file receiving a copy of every event
//! - Configurable log levels, overridable through `RUST_LOG`

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;

use tracing_subscriber::{
    filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer, Registry,
};

use crate::config::Config;
use crate::{Error, Result};

/// Tracing configuration options.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Enable JSON output format
    pub json: bool,
    /// Also append log lines to this file
    pub file: Option<PathBuf>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl From<&Config> for TracingConfig {
    fn from(config: &Config) -> Self {
        Self {
            level: config.log_level.to_lowercase(),
            json: config.log_json,
            file: config.log_file.clone(),
        }
    }
}

/// Initialize tracing with the given configuration.
///
/// # Errors
///
/// Returns an error if the log file cannot be opened or a subscriber is
/// already installed in this process.
pub fn init_tracing(config: &TracingConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let console = if config.json {
        fmt::layer()
            .json()
            .with_target(true)
            .with_thread_names(true)
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let file_layer = match &config.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| {
                    Error::config(format!("cannot open log file '{}': {e}", path.display()))
                })?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file))
                    .boxed(),
            )
        }
        None => None,
    };

    Registry::default()
        .with(env_filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::internal(format!("tracing already initialized: {e}")))?;

    tracing::debug!(
        level = %config.level,
        json = config.json,
        file = ?config.file,
        "Tracing initialized"
    );

    Ok(())
}

/// Span helpers for scan runs.
pub mod spans {
    use std::path::Path;

    use tracing::{info_span, Span};

    /// Create a span covering one coordinator run.
    #[must_use]
    pub fn run_span(mode: &str, root: &Path) -> Span {
        info_span!("scan_run", mode = %mode, root = %root.display())
    }

    /// Create a span for downstream processing of one file.
    #[must_use]
    pub fn file_span(path: &Path) -> Span {
        info_span!("subtitle_file", path = %path.display())
    }
}
