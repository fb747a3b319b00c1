//! Media tree scanning and change detection.
//!
//! This module provides:
//! - Media file recognition by extension
//! - A symlink-aware, mtime-pruned directory walker
//! - Change filtering against the previous run's signatures
//! - Time cutoffs for narrowing results

mod change;
mod filter;
mod threshold;
mod walker;

pub use change::{ChangeFilter, LiveMetadata, MetadataLookup};
pub use filter::MediaFilter;
pub use threshold::TimeThreshold;
pub use walker::{ScanResult, ScanStats, ScanStatsSnapshot, TreeScanner};
