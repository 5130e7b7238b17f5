//! Ordered list of recorded slide segments
//!
//! Insertion order is both display order and chronological order. The
//! ledger does not track edits in progress: callers that hold an index into
//! it (the inline editor) must be torn down before `delete` or `duplicate`
//! shift things around.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::timecode::TimeCode;
use crate::timer::SessionTimer;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid time format for {field}: '{value}', use HH:MM:SS.mmm")]
    InvalidTime { field: SegmentField, value: String },

    #[error("slide number must be a valid number, got '{value}'")]
    InvalidNumber { value: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("no segment at index {index} (ledger has {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// One recorded slide interval.
///
/// Serializes with the field names saved records and subtitle alignment use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    #[serde(rename = "slide_title", default)]
    pub title: String,

    #[serde(rename = "slide_number", default, deserialize_with = "string_or_number")]
    pub number: String,

    pub start_time: TimeCode,

    pub end_time: TimeCode,

    #[serde(default)]
    pub notes: String,
}

/// Older saved records may carry the slide number as a JSON number.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(f) => f.to_string(),
    })
}

impl Segment {
    pub fn new(
        number: impl Into<String>,
        title: impl Into<String>,
        start_time: TimeCode,
        end_time: TimeCode,
    ) -> Self {
        Self {
            title: title.into(),
            number: number.into(),
            start_time,
            end_time,
            notes: String::new(),
        }
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Length in milliseconds; zero if edits put the end before the start.
    pub fn duration_ms(&self) -> u64 {
        self.end_time.millis_since(self.start_time)
    }

    /// Current text of one field, as an editor would show it.
    pub fn field_text(&self, field: SegmentField) -> String {
        match field {
            SegmentField::Number => self.number.clone(),
            SegmentField::Title => self.title.clone(),
            SegmentField::StartTime => self.start_time.to_string(),
            SegmentField::EndTime => self.end_time.to_string(),
            SegmentField::Notes => self.notes.clone(),
        }
    }
}

/// Editable columns of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentField {
    #[serde(rename = "slide_number")]
    Number,
    #[serde(rename = "slide_title")]
    Title,
    StartTime,
    EndTime,
    Notes,
}

impl SegmentField {
    pub const ALL: [SegmentField; 5] = [
        SegmentField::Number,
        SegmentField::Title,
        SegmentField::StartTime,
        SegmentField::EndTime,
        SegmentField::Notes,
    ];

    /// Serialized column name.
    pub fn as_str(self) -> &'static str {
        match self {
            SegmentField::Number => "slide_number",
            SegmentField::Title => "slide_title",
            SegmentField::StartTime => "start_time",
            SegmentField::EndTime => "end_time",
            SegmentField::Notes => "notes",
        }
    }

    /// Human label, e.g. "start time".
    pub fn label(self) -> &'static str {
        match self {
            SegmentField::Number => "slide number",
            SegmentField::Title => "slide title",
            SegmentField::StartTime => "start time",
            SegmentField::EndTime => "end time",
            SegmentField::Notes => "notes",
        }
    }

    pub fn is_time(self) -> bool {
        matches!(self, SegmentField::StartTime | SegmentField::EndTime)
    }
}

impl fmt::Display for SegmentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown segment field '{0}'")]
pub struct UnknownField(pub String);

impl FromStr for SegmentField {
    type Err = UnknownField;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "slide_number" | "number" | "num" => Ok(SegmentField::Number),
            "slide_title" | "title" => Ok(SegmentField::Title),
            "start_time" | "start" => Ok(SegmentField::StartTime),
            "end_time" | "end" => Ok(SegmentField::EndTime),
            "notes" | "note" => Ok(SegmentField::Notes),
            _ => Err(UnknownField(s.to_string())),
        }
    }
}

/// Integer prefix of a slide number, the way a lenient number input reads it.
///
/// `"3"` → 3, `"3.5"` → 3, `" -2x"` → -2, `"abc"` → None.
pub fn leading_integer(text: &str) -> Option<i64> {
    let trimmed = text.trim_start();
    let (sign, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (-1, &trimmed[1..]),
        Some(b'+') => (1, &trimmed[1..]),
        _ => (1, trimmed),
    };

    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    digits[..end].parse::<i64>().ok().map(|n| sign * n)
}

/// Number given to a duplicated segment: the integer part plus one half.
fn half_step_number(number: &str) -> Option<String> {
    leading_integer(number).map(|n| (n as f64 + 0.5).to_string())
}

fn validate_number(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    match trimmed.parse::<f64>() {
        Ok(n) if n.is_finite() => Ok(trimmed.to_string()),
        _ => Err(ValidationError::InvalidNumber {
            value: raw.to_string(),
        }),
    }
}

fn validate_time(field: SegmentField, raw: &str) -> Result<TimeCode, ValidationError> {
    TimeCode::parse(raw).map_err(|_| ValidationError::InvalidTime {
        field,
        value: raw.to_string(),
    })
}

/// Ordered, mutable sequence of segments for one recording.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SegmentLedger {
    segments: Vec<Segment>,
}

impl SegmentLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Close the current segment on `timer` and append it.
    pub fn record(
        &mut self,
        timer: &mut SessionTimer,
        title: impl Into<String>,
        number: impl Into<String>,
        notes: impl Into<String>,
    ) -> &Segment {
        let bounds = timer.mark_segment();
        let segment = Segment {
            title: title.into(),
            number: number.into(),
            start_time: bounds.start,
            end_time: bounds.end,
            notes: notes.into(),
        };

        info!(
            number = %segment.number,
            start = %segment.start_time,
            end = %segment.end_time,
            "segment recorded"
        );

        self.segments.push(segment);
        &self.segments[self.segments.len() - 1]
    }

    /// Append an already-built segment.
    pub fn push(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    /// Insert a copy of `index` right after it, numbered as a half step.
    pub fn duplicate(&mut self, index: usize) -> Result<&Segment, LedgerError> {
        let mut copy = self.get(index)?.clone();
        if let Some(number) = half_step_number(&copy.number) {
            copy.number = number;
        }

        debug!(index, number = %copy.number, "segment duplicated");
        self.segments.insert(index + 1, copy);
        Ok(&self.segments[index + 1])
    }

    /// Remove and return the segment at `index`.
    pub fn delete(&mut self, index: usize) -> Result<Segment, LedgerError> {
        self.check_index(index)?;
        let removed = self.segments.remove(index);
        debug!(index, number = %removed.number, "segment deleted");
        Ok(removed)
    }

    /// Validate `raw` for `field` and store it.
    ///
    /// On any error the segment is left as it was.
    pub fn edit_field(
        &mut self,
        index: usize,
        field: SegmentField,
        raw: &str,
    ) -> Result<&Segment, LedgerError> {
        self.check_index(index)?;

        let segment = &mut self.segments[index];
        match field {
            SegmentField::StartTime => segment.start_time = validate_time(field, raw)?,
            SegmentField::EndTime => segment.end_time = validate_time(field, raw)?,
            SegmentField::Number => segment.number = validate_number(raw)?,
            SegmentField::Title => segment.title = raw.to_string(),
            SegmentField::Notes => segment.notes = raw.to_string(),
        }

        debug!(index, %field, "segment field edited");
        Ok(&self.segments[index])
    }

    /// Text currently stored in one cell.
    pub fn field_value(&self, index: usize, field: SegmentField) -> Result<String, LedgerError> {
        Ok(self.get(index)?.field_text(field))
    }

    pub fn clear(&mut self) {
        self.segments.clear();
    }

    /// Replace the whole sequence, e.g. when loading a saved record.
    pub fn replace(&mut self, segments: Vec<Segment>) {
        self.segments = segments;
    }

    pub fn get(&self, index: usize) -> Result<&Segment, LedgerError> {
        self.segments.get(index).ok_or(LedgerError::IndexOutOfRange {
            index,
            len: self.segments.len(),
        })
    }

    fn check_index(&self, index: usize) -> Result<(), LedgerError> {
        self.get(index).map(|_| ())
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn into_segments(self) -> Vec<Segment> {
        self.segments
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Sum of segment lengths.
    pub fn total_duration_ms(&self) -> u64 {
        self.segments.iter().map(Segment::duration_ms).sum()
    }
}
