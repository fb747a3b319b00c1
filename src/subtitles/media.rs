//! Media identity derived from a file name.

use std::path::{Path, PathBuf};

use crate::error::SubtitleError;

/// What a provider needs to look a file up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaIdentity {
    /// Original path (a symlink path stays a symlink path).
    pub path: PathBuf,
    /// Title words from the file stem.
    pub title: String,
    /// Lowercase container extension.
    pub extension: String,
    /// Release year, if the name carries one.
    pub year: Option<u16>,
    /// Season and episode from an `SxxEyy` tag.
    pub episode: Option<(u16, u16)>,
}

impl MediaIdentity {
    /// Parse a media path.
    ///
    /// The title is everything before the first year or episode tag, with
    /// `.`, `_` and `-` separators turned into spaces.
    ///
    /// # Errors
    ///
    /// Returns [`SubtitleError::UnparseableMediaPath`] if the name is not
    /// UTF-8, has no extension, or yields an empty title.
    pub fn parse(path: &Path) -> Result<Self, SubtitleError> {
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| SubtitleError::unparseable(path, "file name is not valid UTF-8"))?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| SubtitleError::unparseable(path, "missing extension"))?
            .to_lowercase();

        let tokens: Vec<&str> = stem
            .split(|c: char| matches!(c, '.' | '_' | '-' | ' ' | '(' | ')' | '[' | ']'))
            .filter(|t| !t.is_empty())
            .collect();

        let mut title = Vec::new();
        let mut year = None;
        let mut episode = None;

        for (i, token) in tokens.iter().enumerate() {
            if let Some(tag) = parse_episode(token) {
                episode = Some(tag);
                break;
            }
            // A leading year is the title ("2012.mkv").
            if i > 0 {
                if let Some(y) = parse_year(token) {
                    year = Some(y);
                    // Episode tags may follow the year.
                    episode = tokens[i + 1..].iter().find_map(|t| parse_episode(t));
                    break;
                }
            }
            title.push(*token);
        }

        if title.is_empty() {
            return Err(SubtitleError::unparseable(path, "no title in file name"));
        }

        Ok(Self {
            path: path.to_path_buf(),
            title: title.join(" "),
            extension,
            year,
            episode,
        })
    }

    /// Whether this looks like an episode rather than a film.
    #[must_use]
    pub const fn is_episode(&self) -> bool {
        self.episode.is_some()
    }
}

fn parse_year(token: &str) -> Option<u16> {
    if token.len() != 4 || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok().filter(|y| (1900..=2099).contains(y))
}

fn parse_episode(token: &str) -> Option<(u16, u16)> {
    let lower = token.to_ascii_lowercase();
    let rest = lower.strip_prefix('s')?;
    let (season, episode) = rest.split_once('e')?;
    let valid = |s: &str| !s.is_empty() && s.len() <= 3 && s.bytes().all(|b| b.is_ascii_digit());
    if !valid(season) || !valid(episode) {
        return None;
    }
    Some((season.parse().ok()?, episode.parse().ok()?))
}
