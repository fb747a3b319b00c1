//! Provider-driven subtitle download.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::media::MediaIdentity;
use crate::config::Config;
use crate::error::SubtitleError;
use crate::observability::spans;

/// A downloaded subtitle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtitle {
    /// Language code the subtitle was requested in.
    pub language: String,
    /// Name of the provider that supplied it.
    pub provider: String,
    /// Raw subtitle file contents.
    pub content: Vec<u8>,
}

/// A remote subtitle source.
///
/// Implementations own their protocol, credentials and retries.
pub trait SubtitleProvider: Send + Sync {
    /// Provider name, as used in configuration.
    fn name(&self) -> &str;

    /// Best subtitle for `media` in `language`, if the provider has one.
    ///
    /// # Errors
    ///
    /// Returns [`SubtitleError::Provider`] if the lookup fails.
    fn best_subtitle(
        &self,
        media: &MediaIdentity,
        language: &str,
    ) -> Result<Option<Subtitle>, SubtitleError>;
}

/// Consumer of the final file list.
pub trait DownstreamProcessor {
    /// Process a batch; per-file failures are reported, never raised.
    fn process(&self, files: &[PathBuf]) -> BatchReport;
}

/// One file that could not be fully processed.
#[derive(Debug)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: SubtitleError,
}

/// Outcome of a downstream batch.
#[derive(Debug, Default)]
pub struct BatchReport {
    /// Files that parsed into a media identity.
    pub processed: usize,
    /// Subtitle files written.
    pub written: Vec<PathBuf>,
    pub failures: Vec<FileFailure>,
}

impl BatchReport {
    /// Whether every file was handled without error.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Named providers available to the fetcher.
#[derive(Default, Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn SubtitleProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its own name.
    pub fn register(&mut self, provider: Arc<dyn SubtitleProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    /// Look up a provider by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<dyn SubtitleProvider>> {
        self.providers.get(name).cloned()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.providers.keys().collect();
        names.sort();
        f.debug_struct("ProviderRegistry")
            .field("providers", &names)
            .finish()
    }
}

/// Where the subtitle for `original` in `language` is written.
///
/// `movie.mkv` becomes `movie.<language>.srt` in the same directory, next to
/// the path as given (a symlink, not its target).
#[must_use]
pub fn subtitle_path(original: &Path, language: &str) -> PathBuf {
    original.with_extension(format!("{language}.srt"))
}

/// Downloads subtitles for each file and writes them next to it.
pub struct SubtitleFetcher {
    providers: Vec<Arc<dyn SubtitleProvider>>,
    languages: Vec<String>,
}

impl SubtitleFetcher {
    /// Create a fetcher querying `providers` in order.
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn SubtitleProvider>>, languages: Vec<String>) -> Self {
        Self {
            providers,
            languages,
        }
    }

    /// Create a fetcher from the configured provider order.
    ///
    /// Configured names missing from the registry are logged and skipped.
    #[must_use]
    pub fn from_config(config: &Config, registry: &ProviderRegistry) -> Self {
        let providers = config
            .providers
            .iter()
            .filter_map(|name| {
                let provider = registry.get(name);
                if provider.is_none() {
                    tracing::debug!(provider = %name, "Provider not available");
                }
                provider
            })
            .collect();

        Self::new(providers, config.languages.clone())
    }

    /// Whether any provider is available.
    #[must_use]
    pub fn has_providers(&self) -> bool {
        !self.providers.is_empty()
    }

    /// Names of the providers, in query order.
    #[must_use]
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    fn fetch_file(&self, media: &MediaIdentity, report: &mut BatchReport) {
        for language in &self.languages {
            match self.best_subtitle(media, language) {
                Ok(Some(subtitle)) => {
                    let target = subtitle_path(&media.path, language);
                    match std::fs::write(&target, &subtitle.content) {
                        Ok(()) => {
                            tracing::info!(
                                path = %target.display(),
                                provider = %subtitle.provider,
                                "Downloaded subtitle"
                            );
                            report.written.push(target);
                        }
                        Err(e) => {
                            let error = SubtitleError::Write {
                                path: target.display().to_string(),
                                reason: e.to_string(),
                            };
                            tracing::error!(error = %error, "Subtitle download failed");
                            report.failures.push(FileFailure {
                                path: media.path.clone(),
                                error,
                            });
                        }
                    }
                }
                Ok(None) => {
                    tracing::debug!(language = %language, "No subtitle found");
                }
                Err(error) => {
                    tracing::error!(language = %language, error = %error, "Subtitle download failed");
                    report.failures.push(FileFailure {
                        path: media.path.clone(),
                        error,
                    });
                }
            }
        }
    }

    /// Ask providers in order; the first hit wins. An error is returned only
    /// if no provider found a subtitle and at least one failed.
    fn best_subtitle(
        &self,
        media: &MediaIdentity,
        language: &str,
    ) -> Result<Option<Subtitle>, SubtitleError> {
        let mut first_error = None;

        for provider in &self.providers {
            match provider.best_subtitle(media, language) {
                Ok(Some(subtitle)) => return Ok(Some(subtitle)),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(provider = %provider.name(), error = %e, "Provider failed, trying next");
                    first_error.get_or_insert(e);
                }
            }
        }

        first_error.map_or(Ok(None), Err)
    }
}

impl DownstreamProcessor for SubtitleFetcher {
    fn process(&self, files: &[PathBuf]) -> BatchReport {
        let mut report = BatchReport::default();

        if files.is_empty() {
            tracing::info!("No files to process");
            return report;
        }

        let mut videos = Vec::with_capacity(files.len());
        for path in files {
            match MediaIdentity::parse(path) {
                Ok(media) => {
                    tracing::debug!(
                        path = %media.path.display(),
                        title = %media.title,
                        episode = media.is_episode(),
                        "Parsed media file"
                    );
                    videos.push(media);
                }
                Err(error) => {
                    tracing::error!(error = %error, "Could not parse file");
                    report.failures.push(FileFailure {
                        path: path.clone(),
                        error,
                    });
                }
            }
        }

        if videos.is_empty() {
            tracing::warn!("No valid video files for subtitle download");
            return report;
        }

        for media in &videos {
            let span = spans::file_span(&media.path);
            let _guard = span.enter();
            self.fetch_file(media, &mut report);
        }
        report.processed = videos.len();

        tracing::info!(
            processed = report.processed,
            written = report.written.len(),
            failures = report.failures.len(),
            "Subtitle batch complete"
        );

        report
    }
}

impl std::fmt::Debug for SubtitleFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubtitleFetcher")
            .field("providers", &self.provider_names())
            .field("languages", &self.languages)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Provider answering from a fixed table of (title, language) pairs.
    struct FakeProvider {
        name: &'static str,
        known: Vec<(&'static str, &'static str)>,
        fail: bool,
    }

    impl SubtitleProvider for FakeProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn best_subtitle(
            &self,
            media: &MediaIdentity,
            language: &str,
        ) -> Result<Option<Subtitle>, SubtitleError> {
            if self.fail {
                return Err(SubtitleError::Provider {
                    provider: self.name.to_string(),
                    reason: "service unavailable".to_string(),
                });
            }
            let hit = self
                .known
                .iter()
                .any(|(title, lang)| *title == media.title && *lang == language);
            Ok(hit.then(|| Subtitle {
                language: language.to_string(),
                provider: self.name.to_string(),
                content: format!("1\n00:00:01,000 --> 00:00:02,000\n{} [{language}]\n", self.name)
                    .into_bytes(),
            }))
        }
    }

    fn provider(
        name: &'static str,
        known: Vec<(&'static str, &'static str)>,
        fail: bool,
    ) -> Arc<dyn SubtitleProvider> {
        Arc::new(FakeProvider { name, known, fail })
    }

    fn langs(list: &[&str]) -> Vec<String> {
        list.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_subtitle_path() {
        assert_eq!(
            subtitle_path(Path::new("/m/Heat (1995).mkv"), "en"),
            PathBuf::from("/m/Heat (1995).en.srt")
        );
        assert_eq!(
            subtitle_path(Path::new("/m/The.Wire.S01E01.mp4"), "zh"),
            PathBuf::from("/m/The.Wire.S01E01.zh.srt")
        );
    }

    #[test]
    fn test_writes_next_to_original() {
        let tmp = TempDir::new().unwrap();
        let movie = tmp.path().join("Heat (1995).mkv");
        fs::write(&movie, "x").unwrap();

        let fetcher = SubtitleFetcher::new(
            vec![provider("podnapisi", vec![("Heat", "en")], false)],
            langs(&["en", "zh"]),
        );
        let report = fetcher.process(&[movie]);

        assert_eq!(report.processed, 1);
        assert!(report.is_clean());
        let expected = tmp.path().join("Heat (1995).en.srt");
        assert_eq!(report.written, vec![expected.clone()]);
        assert!(fs::read_to_string(expected).unwrap().contains("podnapisi [en]"));
        assert!(!tmp.path().join("Heat (1995).zh.srt").exists());
    }

    #[test]
    fn test_provider_order_and_fallback() {
        let tmp = TempDir::new().unwrap();
        let movie = tmp.path().join("Heat.1995.mkv");
        fs::write(&movie, "x").unwrap();

        let fetcher = SubtitleFetcher::new(
            vec![
                provider("broken", vec![], true),
                provider("first", vec![("Heat", "en")], false),
                provider("second", vec![("Heat", "en")], false),
            ],
            langs(&["en"]),
        );
        let report = fetcher.process(&[movie]);

        assert!(report.is_clean());
        let written = fs::read_to_string(&report.written[0]).unwrap();
        assert!(written.contains("first"));
    }

    #[test]
    fn test_all_providers_failing_is_per_file() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("A.mkv");
        let b = tmp.path().join("B.mkv");
        fs::write(&a, "x").unwrap();
        fs::write(&b, "x").unwrap();

        let fetcher = SubtitleFetcher::new(
            vec![provider("broken", vec![], true)],
            langs(&["en"]),
        );
        let report = fetcher.process(&[a, b]);

        assert_eq!(report.processed, 2);
        assert_eq!(report.failures.len(), 2);
        assert!(matches!(
            report.failures[0].error,
            SubtitleError::Provider { .. }
        ));
    }

    #[test]
    fn test_unparseable_file_skipped() {
        let tmp = TempDir::new().unwrap();
        let good = tmp.path().join("Heat.mkv");
        fs::write(&good, "x").unwrap();

        let fetcher = SubtitleFetcher::new(
            vec![provider("p", vec![("Heat", "en")], false)],
            langs(&["en"]),
        );
        let report = fetcher.process(&[tmp.path().join("S01E01.mkv"), good]);

        assert_eq!(report.processed, 1);
        assert_eq!(report.written.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0].error,
            SubtitleError::UnparseableMediaPath { .. }
        ));
    }

    #[test]
    fn test_write_failure_reported() {
        let tmp = TempDir::new().unwrap();
        // Parent directory does not exist, so the write fails.
        let movie = tmp.path().join("gone").join("Heat.mkv");

        let fetcher = SubtitleFetcher::new(
            vec![provider("p", vec![("Heat", "en")], false)],
            langs(&["en"]),
        );
        let report = fetcher.process(&[movie]);

        assert!(matches!(
            report.failures.as_slice(),
            [FileFailure {
                error: SubtitleError::Write { .. },
                ..
            }]
        ));
    }

    #[test]
    fn test_empty_batch() {
        let fetcher = SubtitleFetcher::new(Vec::new(), langs(&["en"]));
        let report = fetcher.process(&[]);
        assert_eq!(report.processed, 0);
        assert!(report.is_clean());
    }

    #[test]
    fn test_from_config_respects_order() {
        let mut registry = ProviderRegistry::new();
        registry.register(provider("tvsubtitles", vec![], false));
        registry.register(provider("opensubtitles", vec![], false));

        let fetcher = SubtitleFetcher::from_config(&Config::default(), &registry);
        assert!(fetcher.has_providers());
        assert_eq!(fetcher.provider_names(), vec!["opensubtitles", "tvsubtitles"]);

        let empty = SubtitleFetcher::from_config(&Config::default(), &ProviderRegistry::new());
        assert!(!empty.has_providers());
    }
}
