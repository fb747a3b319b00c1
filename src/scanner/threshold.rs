//! Time cutoffs like `2h` or `5d`.

use chrono::{TimeDelta, Utc};

use crate::error::ScanError;
use crate::storage::Timestamp;

/// Cutoff instant: only files modified at or after it are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeThreshold(Timestamp);

impl TimeThreshold {
    /// Threshold at an explicit instant.
    #[must_use]
    pub const fn at(cutoff: Timestamp) -> Self {
        Self(cutoff)
    }

    /// The cutoff instant.
    #[must_use]
    pub const fn cutoff(&self) -> Timestamp {
        self.0
    }

    /// Whether a modification time passes the cutoff.
    #[must_use]
    pub fn admits(&self, mtime: Timestamp) -> bool {
        mtime >= self.0
    }

    /// Parse a filter relative to the current time.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidTimeFilter`] if the text is not a
    /// recognized filter.
    pub fn parse(text: &str) -> Result<Option<Self>, ScanError> {
        Self::parse_at(text, Utc::now())
    }

    /// Parse a filter relative to `now`.
    ///
    /// Accepts `<digits><m|h|d|w>`. `all`, `ignore` and the empty string mean
    /// no cutoff.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError::InvalidTimeFilter`] for anything else, including
    /// spans too large to subtract from `now`.
    pub fn parse_at(text: &str, now: Timestamp) -> Result<Option<Self>, ScanError> {
        let text = text.trim();
        if text.is_empty() || text.eq_ignore_ascii_case("all") || text.eq_ignore_ascii_case("ignore")
        {
            return Ok(None);
        }

        parse_span(text)
            .and_then(|span| now.checked_sub_signed(span))
            .map(|cutoff| Some(Self(cutoff)))
            .ok_or_else(|| ScanError::InvalidTimeFilter(text.to_string()))
    }
}

fn parse_span(text: &str) -> Option<TimeDelta> {
    let unit = text.chars().last()?;
    let digits = &text[..text.len() - unit.len_utf8()];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: i64 = digits.parse().ok()?;

    match unit {
        'm' => TimeDelta::try_minutes(value),
        'h' => TimeDelta::try_hours(value),
        'd' => TimeDelta::try_days(value),
        'w' => TimeDelta::try_weeks(value),
        _ => None,
    }
}
