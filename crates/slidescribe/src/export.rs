//! Portable JSON exports of a lecture's segments and of aligned slides

use std::path::Path;

use anyhow::{ensure, Context, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ledger::Segment;
use crate::subtitles::AlignedSlide;

/// A lecture's segments, ready to hand to someone else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub lecture: String,
    pub exported_at: DateTime<Utc>,
    pub records: Vec<Segment>,
}

impl ExportDocument {
    pub fn new(lecture: impl Into<String>, records: Vec<Segment>) -> Result<Self> {
        ensure!(!records.is_empty(), "no records to export");
        Ok(Self {
            lecture: lecture.into(),
            exported_at: Utc::now(),
            records,
        })
    }

    /// `<lecture>_slides_<YYYY-MM-DD>.json`
    pub fn file_name(&self) -> String {
        export_file_name(&self.lecture, self.exported_at.date_naive())
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write export: {}", path.display()))?;
        info!(path = %path.display(), count = self.records.len(), "records exported");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read export: {}", path.display()))?;
        serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse export: {}", path.display()))
    }
}

pub fn export_file_name(lecture: &str, date: NaiveDate) -> String {
    format!("{}_slides_{}.json", lecture, date.format("%Y-%m-%d"))
}

/// Subtitle alignment results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentExport {
    pub exported_at: DateTime<Utc>,
    pub slide_count: usize,
    pub slides: Vec<AlignedSlide>,
}

impl AlignmentExport {
    pub fn new(slides: Vec<AlignedSlide>) -> Result<Self> {
        ensure!(!slides.is_empty(), "no aligned slides to export");
        Ok(Self {
            exported_at: Utc::now(),
            slide_count: slides.len(),
            slides,
        })
    }

    /// `parsed_results_<YYYYmmdd_HHMMSS>.json`
    pub fn default_file_name(at: DateTime<Local>) -> String {
        format!("parsed_results_{}.json", at.format("%Y%m%d_%H%M%S"))
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write alignment: {}", path.display()))?;
        info!(path = %path.display(), slides = self.slide_count, "alignment exported");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timecode::TimeCode;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn records() -> Vec<Segment> {
        vec![Segment::new(
            "1",
            "Intro",
            TimeCode::ZERO,
            TimeCode::from_millis(1_500),
        )]
    }

    #[test]
    fn test_export_shape() {
        let doc = ExportDocument::new("Physics", records()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();
        assert_eq!(value["lecture"], "Physics");
        assert!(value["exported_at"].is_string());
        assert_eq!(value["records"][0]["slide_title"], "Intro");
        assert_eq!(value["records"][0]["end_time"], "00:00:01.500");
    }

    #[test]
    fn test_empty_export_is_refused() {
        assert!(ExportDocument::new("Physics", Vec::new()).is_err());
        assert!(AlignmentExport::new(Vec::new()).is_err());
    }

    #[test]
    fn test_file_names() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(export_file_name("Physics", date), "Physics_slides_2024-03-01.json");

        let at = Local.with_ymd_and_hms(2024, 3, 1, 9, 5, 7).unwrap();
        assert_eq!(
            AlignmentExport::default_file_name(at),
            "parsed_results_20240301_090507.json"
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let doc = ExportDocument::new("Physics", records()).unwrap();
        let path = dir.path().join(doc.file_name());
        doc.save(&path).unwrap();

        let loaded = ExportDocument::load(&path).unwrap();
        assert_eq!(loaded, doc);
    }

    #[test]
    fn test_alignment_export_counts_slides() {
        let slide = AlignedSlide {
            slide_number: "1".into(),
            slide_title: "Intro".into(),
            start_time: TimeCode::ZERO,
            end_time: TimeCode::from_millis(1_000),
            notes: String::new(),
            text: "hello".into(),
        };
        let export = AlignmentExport::new(vec![slide.clone(), slide]).unwrap();
        assert_eq!(export.slide_count, 2);

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        export.save(&path).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["slides"][1]["text"], "hello");
    }
}
