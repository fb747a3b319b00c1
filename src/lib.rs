//! subsift library
//!
//! Incremental media library scanner. A run walks a directory tree, prunes
//! subtrees whose directory signature is unchanged since the last run, and
//! hands new or modified video files to a downstream subtitle fetcher.
//!
//! The main entry point is [`coordinator::ScanCoordinator`].

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod coordinator;
pub mod error;
pub mod observability;
pub mod prompt;
pub mod scanner;
pub mod storage;
pub mod subtitles;

pub use config::Config;
pub use error::{Error, Result};
