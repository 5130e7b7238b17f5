//! Canonical `HH:MM:SS.mmm` time text and its millisecond value.
//!
//! Parsing is strict about shape and lenient about range: `"00:99:00.000"`
//! is accepted and means 99 minutes. Formatting always normalizes, so
//! `format(parse(s)) == s` holds only when minutes and seconds are below 60.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;

fn canonical_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^([0-9]{2}):([0-9]{2}):([0-9]{2})\.([0-9]{3})$")
            .expect("canonical time pattern is valid")
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeCodeError {
    #[error("invalid time format '{0}', expected HH:MM:SS.mmm")]
    InvalidTimeFormat(String),
}

/// A point on the session clock, in whole milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[derive(Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeCode(pub u64);

impl TimeCode {
    pub const ZERO: TimeCode = TimeCode(0);

    pub fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    pub fn as_millis(self) -> u64 {
        self.0
    }

    /// Parse canonical time text.
    pub fn parse(text: &str) -> Result<Self, TimeCodeError> {
        let caps = canonical_pattern()
            .captures(text)
            .ok_or_else(|| TimeCodeError::InvalidTimeFormat(text.to_string()))?;

        // Every group is 2-3 ASCII digits, so these cannot fail
        let field = |i: usize| caps[i].parse::<u64>().unwrap_or(0);

        Ok(Self(
            field(1) * MS_PER_HOUR + field(2) * MS_PER_MINUTE + field(3) * MS_PER_SECOND + field(4),
        ))
    }

    /// True when `text` would parse.
    pub fn is_valid(text: &str) -> bool {
        canonical_pattern().is_match(text)
    }

    pub fn saturating_add_millis(self, ms: u64) -> Self {
        Self(self.0.saturating_add(ms))
    }

    /// Milliseconds from `earlier` to `self`, zero if `earlier` is later.
    pub fn millis_since(self, earlier: TimeCode) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    pub fn as_secs_f64(self) -> f64 {
        self.0 as f64 / MS_PER_SECOND as f64
    }
}

impl fmt::Display for TimeCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hours = self.0 / MS_PER_HOUR;
        let minutes = (self.0 % MS_PER_HOUR) / MS_PER_MINUTE;
        let seconds = (self.0 % MS_PER_MINUTE) / MS_PER_SECOND;
        let millis = self.0 % MS_PER_SECOND;
        write!(f, "{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
    }
}

impl FromStr for TimeCode {
    type Err = TimeCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for TimeCode {
    type Error = TimeCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TimeCode> for String {
    fn from(value: TimeCode) -> Self {
        value.to_string()
    }
}
