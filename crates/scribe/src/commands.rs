//! Non-interactive command implementations

use std::path::Path;

use anyhow::{bail, Context, Result};
use owo_colors::OwoColorize;
use scribeconf::{ConfigSources, ScribeConfig};
use slidescribe::{
    align, parse_srt, AlignmentExport, RecordStore, ScopeKey, Segment, SubtitleSummary,
};

/// Print saved lectures for `user`
pub fn lectures_list(store: &dyn RecordStore, user: &str) -> Result<()> {
    let lectures = store.list_lectures(user)?;
    if lectures.is_empty() {
        println!("No lectures yet. Create one with: scribe lectures create <name>");
        return Ok(());
    }
    for lecture in lectures {
        println!("{lecture}");
    }
    Ok(())
}

pub fn lectures_create(store: &dyn RecordStore, user: &str, name: &str) -> Result<()> {
    let name = name.trim();
    store.create_lecture(user, name)?;
    println!("Lecture '{name}' created");
    Ok(())
}

pub fn lectures_delete(store: &dyn RecordStore, user: &str, name: &str) -> Result<()> {
    if !store.delete_lecture(user, name)? {
        bail!("Lecture not found: {name}");
    }
    println!("Lecture '{name}' deleted");
    Ok(())
}

pub fn records_list(store: &dyn RecordStore, user: &str, lecture: &str) -> Result<()> {
    let records = store.list_records(user, lecture)?;
    if records.is_empty() {
        println!("No records for '{lecture}'");
        return Ok(());
    }
    for record in records {
        println!("{record}");
    }
    Ok(())
}

fn print_segments(segments: &[Segment]) {
    println!(
        "{:>3}  {:<6} {:<24} {:<12} {:<12} {}",
        "#", "No.", "Title", "Start", "End", "Notes"
    );
    for (i, s) in segments.iter().enumerate() {
        println!(
            "{:>3}  {:<6} {:<24} {:<12} {:<12} {}",
            i + 1,
            s.number,
            s.title,
            s.start_time,
            s.end_time,
            s.notes
        );
    }
}

pub fn records_show(store: &dyn RecordStore, scope: &ScopeKey, json: bool) -> Result<()> {
    let Some(doc) = store.load_document(scope)? else {
        bail!("Record not found: {scope}");
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("{} {}", "Lecture:".bold(), doc.lecture_name);
    println!("{} {}", "Record:".bold(), scope.record);
    if let Some(created) = doc.created_at {
        println!("{} {}", "Created:".bold(), created.to_rfc3339());
    }
    if let Some(updated) = doc.updated_at {
        println!("{} {}", "Updated:".bold(), updated.to_rfc3339());
    }
    println!();
    print_segments(&doc.records);
    Ok(())
}

pub fn records_delete(store: &dyn RecordStore, scope: &ScopeKey) -> Result<()> {
    if !store.delete_record(scope)? {
        bail!("Record not found: {scope}");
    }
    println!("Record '{}' deleted", scope.record);
    Ok(())
}

/// Match a saved record against an SRT file
pub fn align_record(
    store: &dyn RecordStore,
    scope: &ScopeKey,
    srt_path: &Path,
    output: Option<&Path>,
) -> Result<()> {
    let segments = store
        .load(scope)?
        .with_context(|| format!("Timer record not found: {scope}"))?;
    if segments.is_empty() {
        bail!("No timer records found in {scope}");
    }

    let content = std::fs::read_to_string(srt_path)
        .with_context(|| format!("Failed to read SRT file: {}", srt_path.display()))?;
    let subtitles = parse_srt(&content);
    if subtitles.is_empty() {
        bail!("Invalid SRT file or no subtitles found: {}", srt_path.display());
    }

    let summary = SubtitleSummary::of(&subtitles, 0);
    println!(
        "{} subtitles, {} of audio, {} slides",
        summary.count,
        summary.duration_label(),
        segments.len()
    );

    let aligned = align(&subtitles, &segments);
    if aligned.is_empty() {
        bail!("No matching content found between SRT and timer records");
    }

    for slide in &aligned {
        println!(
            "\n{} {} [{} - {}]",
            format!("Slide {}", slide.slide_number).bright_cyan(),
            slide.slide_title.bold(),
            slide.start_time,
            slide.end_time
        );
        println!("  {}", slide.text);
    }

    if let Some(path) = output {
        AlignmentExport::new(aligned)?.save(path)?;
        println!("\nResults written to {}", path.display());
    }
    Ok(())
}

/// Print the effective configuration as TOML
pub fn show_config(config: &ScribeConfig, sources: &ConfigSources, with_sources: bool) {
    if with_sources {
        if sources.files.is_empty() {
            println!("# No config files found, using defaults");
        }
        for file in &sources.files {
            println!("# loaded: {}", file.display());
        }
        for var in &sources.env_overrides {
            println!("# env override: {var}");
        }
        println!();
    }
    print!("{}", config.to_toml());
}
