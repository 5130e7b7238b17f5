//! SRT parsing and subtitle-to-slide alignment
//!
//! Given a lecture's subtitles and the recorded slide segments, collect the
//! spoken text that falls inside each slide's interval.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::ledger::Segment;
use crate::timecode::TimeCode;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubtitleError {
    #[error("invalid subtitle time '{0}', expected HH:MM:SS,mmm")]
    InvalidTime(String),
}

const TIME: &str = r"([0-9]{2}):([0-9]{2}):([0-9]{2})[.,]([0-9]{3})";

fn time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!("^{TIME}")).expect("subtitle time pattern is valid")
    })
}

fn range_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        let stamp = r"[0-9]{2}:[0-9]{2}:[0-9]{2}[.,][0-9]{3}";
        Regex::new(&format!("^({stamp}) --> ({stamp})")).expect("subtitle range pattern is valid")
    })
}

/// Parse `HH:MM:SS,mmm` or `HH:MM:SS.mmm`; trailing text is ignored.
pub fn parse_srt_time(text: &str) -> Result<TimeCode, SubtitleError> {
    let caps = time_pattern()
        .captures(text)
        .ok_or_else(|| SubtitleError::InvalidTime(text.to_string()))?;
    let field = |i: usize| caps[i].parse::<u64>().unwrap_or(0);

    Ok(TimeCode::from_millis(
        ((field(1) * 60 + field(2)) * 60 + field(3)) * 1000 + field(4),
    ))
}

/// One cue from an SRT file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subtitle {
    pub index: String,
    pub start_time: TimeCode,
    pub end_time: TimeCode,
    pub text: String,
}

/// Parse SRT content into cues, skipping malformed blocks.
///
/// A block is index, `start --> end`, then one or more text lines, which are
/// joined with spaces.
pub fn parse_srt(content: &str) -> Vec<Subtitle> {
    let mut subtitles = Vec::new();
    let mut block: Vec<&str> = Vec::new();

    for line in content.lines().chain(std::iter::once("")) {
        let line = line.trim();
        if !line.is_empty() {
            block.push(line);
            continue;
        }
        if let Some(subtitle) = parse_block(&block) {
            subtitles.push(subtitle);
        }
        block.clear();
    }

    debug!(count = subtitles.len(), "subtitles parsed");
    subtitles
}

fn parse_block(lines: &[&str]) -> Option<Subtitle> {
    if lines.len() < 3 {
        return None;
    }
    let caps = range_pattern().captures(lines[1])?;
    Some(Subtitle {
        index: lines[0].to_string(),
        start_time: parse_srt_time(&caps[1]).ok()?,
        end_time: parse_srt_time(&caps[2]).ok()?,
        text: lines[2..].join(" "),
    })
}

/// A slide with the subtitle text spoken during it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignedSlide {
    pub slide_number: String,
    pub slide_title: String,
    pub start_time: TimeCode,
    pub end_time: TimeCode,
    pub notes: String,
    pub text: String,
}

/// Attach subtitle text to each segment.
///
/// A subtitle belongs to a slide when it starts and ends within the slide's
/// end bound and does not end before the slide starts. Slides that collect
/// no text are left out.
pub fn align(subtitles: &[Subtitle], segments: &[Segment]) -> Vec<AlignedSlide> {
    let mut sorted: Vec<&Subtitle> = subtitles.iter().collect();
    sorted.sort_by_key(|s| s.start_time);

    let mut cursor = 0;
    let mut aligned = Vec::new();

    for segment in segments {
        while cursor < sorted.len() && sorted[cursor].end_time < segment.start_time {
            cursor += 1;
        }

        let texts: Vec<&str> = sorted[cursor..]
            .iter()
            .take_while(|s| s.start_time <= segment.end_time)
            .filter(|s| s.end_time <= segment.end_time)
            .map(|s| s.text.as_str())
            .collect();

        if texts.is_empty() {
            continue;
        }

        aligned.push(AlignedSlide {
            slide_number: segment.number.clone(),
            slide_title: segment.title.clone(),
            start_time: segment.start_time,
            end_time: segment.end_time,
            notes: segment.notes.clone(),
            text: texts.join(" "),
        });
    }

    debug!(
        slides = segments.len(),
        matched = aligned.len(),
        "subtitles aligned"
    );
    aligned
}

/// Quick description of an SRT file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtitleSummary {
    pub count: usize,
    /// End of the last cue in file order
    pub duration_secs: f64,
    pub preview: Vec<Subtitle>,
}

impl SubtitleSummary {
    pub fn of(subtitles: &[Subtitle], preview_limit: usize) -> Self {
        Self {
            count: subtitles.len(),
            duration_secs: subtitles
                .last()
                .map(|s| s.end_time.as_secs_f64())
                .unwrap_or(0.0),
            preview: subtitles.iter().take(preview_limit).cloned().collect(),
        }
    }

    /// `"12.3s"`
    pub fn duration_label(&self) -> String {
        format!("{:.1}s", self.duration_secs)
    }
}
