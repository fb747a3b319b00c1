//! Configuration settings and validation.

use crate::{Error, Result};
use std::path::PathBuf;

/// File name of the directory-signature cache.
pub const DIR_CACHE_FILENAME: &str = "dir_cache.json";

/// File name of the file-signature cache.
pub const FILE_CACHE_FILENAME: &str = "scan_cache.json";

/// Default subtitle languages.
pub const DEFAULT_LANGUAGES: &[&str] = &["en", "zh"];

/// Default provider order.
pub const DEFAULT_PROVIDERS: &[&str] = &[
    "opensubtitles",
    "opensubtitlescom",
    "podnapisi",
    "tvsubtitles",
];

/// Main configuration for subsift.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the two signature cache files.
    pub cache_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines.
    pub log_json: bool,

    /// Optional file that receives a copy of the log output.
    pub log_file: Option<PathBuf>,

    /// Worker threads used to capture file signatures.
    pub scan_threads: usize,

    /// Subtitle language codes, in preference order.
    pub languages: Vec<String>,

    /// Subtitle provider names, in query order.
    pub providers: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("./.subsift"),
            log_level: "info".to_string(),
            log_json: false,
            log_file: None,
            scan_threads: std::thread::available_parallelism()
                .map(|n| n.get().min(8))
                .unwrap_or(4),
            languages: DEFAULT_LANGUAGES.iter().map(ToString::to_string).collect(),
            providers: DEFAULT_PROVIDERS.iter().map(ToString::to_string).collect(),
        }
    }
}

impl Config {
    /// Create a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.scan_threads == 0 {
            return Err(Error::config("scan_threads cannot be 0"));
        }

        if self.scan_threads > 64 {
            return Err(Error::config("scan_threads cannot exceed 64"));
        }

        if self.cache_dir.as_os_str().is_empty() {
            return Err(Error::config("cache_dir cannot be empty"));
        }

        if self.languages.is_empty() {
            return Err(Error::config("at least one language is required"));
        }

        for lang in &self.languages {
            let well_formed = (2..=3).contains(&lang.len())
                && lang.chars().all(|c| c.is_ascii_lowercase());
            if !well_formed {
                return Err(Error::config(format!(
                    "invalid language code '{lang}', expected 2 or 3 lowercase letters"
                )));
            }
        }

        if self.providers.iter().any(|p| p.trim().is_empty()) {
            return Err(Error::config("provider names cannot be empty"));
        }

        Ok(())
    }

    /// Path to the directory-signature cache file.
    #[must_use]
    pub fn dir_cache_path(&self) -> PathBuf {
        self.cache_dir.join(DIR_CACHE_FILENAME)
    }

    /// Path to the file-signature cache file.
    #[must_use]
    pub fn file_cache_path(&self) -> PathBuf {
        self.cache_dir.join(FILE_CACHE_FILENAME)
    }
}
