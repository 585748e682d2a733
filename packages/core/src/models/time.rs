//! Time Model
//!
//! Classifies the free-form time strings carried by timeline nodes and defines
//! the total order used when sibling nodes are sorted by time.
//!
//! A time value is one of:
//!
//! - **Absolute**: parses as a real calendar date (or date-time)
//! - **Fictional**: any other non-empty string, e.g. `"Year 3000"` or `"Third Age 3019"`
//! - **Empty**: `None`, `""` or whitespace only
//!
//! Fictional values are opaque labels. They are compared byte-lexicographically
//! against each other and carry no semantic understanding of fictional eras.
//!
//! # Examples
//!
//! ```rust
//! use timeline_core::models::time::{compare_times, TimeValue};
//! use std::cmp::Ordering;
//!
//! assert!(TimeValue::classify(Some("1939-09-01")).is_absolute());
//! assert!(matches!(TimeValue::classify(Some("Year 3000")), TimeValue::Fictional(_)));
//! assert_eq!(TimeValue::classify(None), TimeValue::Empty);
//!
//! // Real dates always come before fictional labels
//! assert_eq!(compare_times(Some("2024-01-01"), Some("Year 3000")), Ordering::Less);
//! ```
//!
//! The module also hosts the [`TimeProvider`] seam used for `created_at` /
//! `modified_at` stamping, so tests can pin the clock.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::cmp::Ordering;

/// Date-time layouts accepted in addition to RFC 3339 / RFC 2822.
const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Date-only layouts, interpreted as midnight UTC.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%B %d, %Y",
    "%b %d, %Y",
    "%d %B %Y",
    "%d %b %Y",
];

/// Classification of a node time value.
///
/// Variant order is significant: the derived `Ord` places every absolute
/// value before every fictional value, and both before `Empty`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimeValue {
    /// A real calendar instant (date-only values are midnight UTC)
    Absolute(DateTime<Utc>),
    /// An opaque fictional label, compared lexicographically
    Fictional(String),
    /// No explicit time; ordering defers to relative position / explicit order
    Empty,
}

impl TimeValue {
    /// Classify a raw time value. Never fails: anything that is not a date is fictional.
    pub fn classify(value: Option<&str>) -> Self {
        let Some(raw) = value else {
            return TimeValue::Empty;
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return TimeValue::Empty;
        }
        match parse_absolute(trimmed) {
            Some(instant) => TimeValue::Absolute(instant),
            None => TimeValue::Fictional(raw.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, TimeValue::Empty)
    }

    pub fn is_absolute(&self) -> bool {
        matches!(self, TimeValue::Absolute(_))
    }
}

/// Compare two raw time values using the timeline ordering rules.
///
/// - non-empty sorts before empty, two empties are equal
/// - absolute vs absolute compares by instant
/// - fictional vs fictional compares the raw strings
/// - absolute always sorts before fictional
pub fn compare_times(a: Option<&str>, b: Option<&str>) -> Ordering {
    TimeValue::classify(a).cmp(&TimeValue::classify(b))
}

/// Parse a value that must be an absolute date.
///
/// Returns `None` for empty and fictional values. Callers that need
/// "must be a real date" semantics map this to an `InvalidTimeValue` error.
pub fn parse_absolute(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date_at_midnight(date);
        }
    }

    // "YYYY-MM"
    if let Some((year, month)) = value.split_once('-') {
        if is_digits(year, 1, 4) && is_digits(month, 1, 2) {
            let date = NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)?;
            return date_at_midnight(date);
        }
    }

    // Bare year, e.g. "1939"
    if is_digits(value, 1, 4) {
        let date = NaiveDate::from_ymd_opt(value.parse().ok()?, 1, 1)?;
        return date_at_midnight(date);
    }

    None
}

fn date_at_midnight(date: NaiveDate) -> Option<DateTime<Utc>> {
    date.and_hms_opt(0, 0, 0)
        .map(|naive| Utc.from_utc_datetime(&naive))
}

fn is_digits(s: &str, min: usize, max: usize) -> bool {
    (min..=max).contains(&s.len()) && s.bytes().all(|b| b.is_ascii_digit())
}

/// Trait for providing current time
///
/// Used to stamp `created_at` / `modified_at`. Tests inject
/// [`FixedTimeProvider`] to get deterministic timestamps.
pub trait TimeProvider: Send + Sync {
    /// Get the current UTC time
    fn now(&self) -> DateTime<Utc>;
}

/// System time provider using actual system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeProvider;

impl TimeProvider for SystemTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Time provider pinned to a single instant
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeProvider(pub DateTime<Utc>);

impl TimeProvider for FixedTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
