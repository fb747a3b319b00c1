//! Downstream subtitle acquisition.
//!
//! The scan core hands its final file list to a [`DownstreamProcessor`].
//! [`SubtitleFetcher`] is the provider-driven implementation; providers
//! themselves are supplied by the caller.

mod fetcher;
mod media;

pub use fetcher::{
    subtitle_path, BatchReport, DownstreamProcessor, FileFailure, ProviderRegistry, Subtitle,
    SubtitleFetcher, SubtitleProvider,
};
pub use media::MediaIdentity;
