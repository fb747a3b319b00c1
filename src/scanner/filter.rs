//! Media file recognition by extension.

use std::path::Path;

/// Container extensions treated as media, with their display names.
const MEDIA_EXTENSIONS: &[(&str, &str)] = &[
    ("mp4", "MPEG-4"),
    ("mkv", "Matroska"),
    ("avi", "AVI"),
    ("mov", "QuickTime"),
];

/// Filter deciding which files are tracked.
#[derive(Debug, Clone)]
pub struct MediaFilter {
    extensions: Vec<String>,
}

impl Default for MediaFilter {
    fn default() -> Self {
        Self {
            extensions: MEDIA_EXTENSIONS
                .iter()
                .map(|(ext, _)| (*ext).to_string())
                .collect(),
        }
    }
}

impl MediaFilter {
    /// Create the default media filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a path names a media file, ignoring case.
    #[must_use]
    pub fn is_media(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                let ext = ext.to_lowercase();
                self.extensions.iter().any(|e| *e == ext)
            })
    }

    /// Human-readable container name for a built-in media extension.
    #[must_use]
    pub fn container_name(path: &Path) -> Option<&'static str> {
        path.extension().and_then(|e| e.to_str()).and_then(|ext| {
            MEDIA_EXTENSIONS
                .iter()
                .find(|(e, _)| e.eq_ignore_ascii_case(ext))
                .map(|(_, name)| *name)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_media() {
        let filter = MediaFilter::new();
        assert!(filter.is_media(Path::new("Heat (1995).mkv")));
        assert!(filter.is_media(Path::new("clip.mp4")));
        assert!(filter.is_media(Path::new("old.avi")));
        assert!(filter.is_media(Path::new("trailer.mov")));
        assert!(!filter.is_media(Path::new("Heat (1995).en.srt")));
        assert!(!filter.is_media(Path::new("poster.jpg")));
        assert!(!filter.is_media(Path::new("mkv")));
    }

    #[test]
    fn test_is_media_case_insensitive() {
        let filter = MediaFilter::new();
        assert!(filter.is_media(Path::new("SHOUTING.MKV")));
        assert!(filter.is_media(Path::new("Mixed.Mp4")));
    }

    #[test]
    fn test_container_name() {
        assert_eq!(
            MediaFilter::container_name(Path::new("a.MKV")),
            Some("Matroska")
        );
        assert_eq!(MediaFilter::container_name(Path::new("a.txt")), None);
    }
}
