//! Configuration management for subsift.
//!
//! Supports configuration from:
//! - Command-line arguments (highest priority)
//! - Environment variables
//! - Built-in defaults (lowest priority)

mod settings;

pub use settings::{
    Config, DEFAULT_LANGUAGES, DEFAULT_PROVIDERS, DIR_CACHE_FILENAME, FILE_CACHE_FILENAME,
};
