//! scribe - slide timing from the terminal
//!
//! Subcommands:
//! - `scribe session --lecture <name>` - interactive recording session
//! - `scribe lectures list|create|delete` - manage lectures
//! - `scribe records list|show|delete` - manage saved records
//! - `scribe align` - match a saved record against an SRT file
//! - `scribe config` - print the effective configuration

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use scribeconf::ScribeConfig;
use slidescribe::{
    AlignmentExport, FileRecordStore, RecordStore, RecordingSession, ScopeKey, SystemClock,
};
use tracing::{debug, info};

mod commands;
mod repl;
mod telemetry;

#[derive(Parser)]
#[command(name = "scribe")]
#[command(about = "Mark slide boundaries during a live presentation")]
#[command(version)]
struct Cli {
    /// Config file to use instead of ./slidescribe.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// User whose lectures to work with (default: from config)
    #[arg(short, long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run an interactive recording session
    Session {
        /// Lecture to record into
        #[arg(short, long)]
        lecture: String,

        /// Saved record to load and keep saving to
        #[arg(short, long)]
        record: Option<String>,
    },

    /// Manage lectures
    Lectures {
        #[command(subcommand)]
        action: LectureAction,
    },

    /// Manage saved records
    Records {
        #[command(subcommand)]
        action: RecordAction,
    },

    /// Attach subtitle text to the slides of a saved record
    Align {
        /// Lecture the record belongs to
        #[arg(short, long)]
        lecture: String,

        /// Saved record name
        #[arg(short, long)]
        record: String,

        /// SRT subtitle file
        #[arg(short, long)]
        srt: PathBuf,

        /// Write the aligned slides as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Write the aligned slides to parsed_results_<timestamp>.json
        #[arg(short, long, conflicts_with = "output")]
        export: bool,
    },

    /// Print the effective configuration
    Config {
        /// Also show which files and environment variables were used
        #[arg(long)]
        sources: bool,
    },
}

#[derive(Subcommand)]
enum LectureAction {
    /// List lectures
    List,

    /// Create a lecture
    Create { name: String },

    /// Delete a lecture and all of its records
    Delete { name: String },
}

#[derive(Subcommand)]
enum RecordAction {
    /// List saved records of a lecture
    List {
        #[arg(short, long)]
        lecture: String,
    },

    /// Show a saved record
    Show {
        #[arg(short, long)]
        lecture: String,

        record: String,

        /// Print the stored JSON document
        #[arg(long)]
        json: bool,
    },

    /// Delete a saved record
    Delete {
        #[arg(short, long)]
        lecture: String,

        record: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (config, sources) = ScribeConfig::load_with_sources_from(cli.config.as_deref())
        .context("Failed to load configuration")?;
    telemetry::init(&config.infra.telemetry.log_level)?;
    debug!(files = ?sources.files, env = ?sources.env_overrides, "configuration loaded");

    let user = cli
        .user
        .clone()
        .unwrap_or_else(|| config.bootstrap.user.name.clone());
    let store = FileRecordStore::new(&config.infra.paths.data_dir);

    match cli.command {
        Commands::Session { lecture, record } => {
            store.create_lecture(&user, &lecture)?;

            let mut session = RecordingSession::new(Arc::new(SystemClock))
                .with_start_input(config.bootstrap.timer.default_start_time.clone())
                .with_lecture(lecture.clone());

            let record = match record {
                Some(name) => {
                    let scope = ScopeKey::new(&user, &lecture, name);
                    if let Some(segments) = store.load(&scope)? {
                        info!(%scope, count = segments.len(), "record loaded");
                        session.load_segments(segments);
                    }
                    Some(scope.record)
                }
                None => None,
            };

            let refresh = Duration::from_millis(config.bootstrap.timer.refresh_interval_ms);
            repl::run(repl::Repl::new(session, &store, &user, record), refresh).await?;
        }
        Commands::Lectures { action } => match action {
            LectureAction::List => commands::lectures_list(&store, &user)?,
            LectureAction::Create { name } => commands::lectures_create(&store, &user, &name)?,
            LectureAction::Delete { name } => commands::lectures_delete(&store, &user, &name)?,
        },
        Commands::Records { action } => match action {
            RecordAction::List { lecture } => commands::records_list(&store, &user, &lecture)?,
            RecordAction::Show {
                lecture,
                record,
                json,
            } => commands::records_show(&store, &ScopeKey::new(&user, lecture, record), json)?,
            RecordAction::Delete { lecture, record } => {
                commands::records_delete(&store, &ScopeKey::new(&user, lecture, record))?
            }
        },
        Commands::Align {
            lecture,
            record,
            srt,
            output,
            export,
        } => {
            let scope = ScopeKey::new(&user, lecture, record);
            let output = match (output, export) {
                (Some(path), _) => Some(path),
                (None, true) => Some(PathBuf::from(AlignmentExport::default_file_name(
                    Local::now(),
                ))),
                (None, false) => None,
            };
            commands::align_record(&store, &scope, &srt, output.as_deref())?;
        }
        Commands::Config { sources: show } => {
            commands::show_config(&config, &sources, show);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "scribe", "records", "list", "--lecture", "Physics", "--user", "alice",
        ])
        .unwrap();
        assert_eq!(cli.user.as_deref(), Some("alice"));
        assert!(matches!(
            cli.command,
            Commands::Records {
                action: RecordAction::List { .. }
            }
        ));
    }

    #[test]
    fn test_align_export_conflicts_with_output() {
        let base = ["scribe", "align", "-l", "Physics", "-r", "take1", "-s", "talk.srt"];
        let cli = Cli::try_parse_from(base.iter().copied().chain(["--export"])).unwrap();
        assert!(matches!(cli.command, Commands::Align { export: true, .. }));

        let both = base.iter().copied().chain(["--export", "--output", "out.json"]);
        assert!(Cli::try_parse_from(both).is_err());
    }
}
