//! Interactive recording session
//!
//! One command per line. Row indices are 1-based here and converted before
//! they reach the session.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Result};
use chrono::Local;
use owo_colors::OwoColorize;
use rustyline::DefaultEditor;
use slidescribe::{
    default_record_name, BeginOutcome, CellRef, ExportDocument, FocusTarget, RecordStore,
    Committed, RecordingSession, ScopeKey, Segment, SegmentField,
};
use thiserror::Error;
use tracing::{debug, info};

pub const HELP: &str = "\
Timer
  start [HH:MM:SS.mmm]   start or resume (default: the start-time input)
  pause                  pause; the start time moves to the paused position
  reset                  stop, clear all slides, renumber from 1
  time                   show the current position
  watch <secs>           follow the clock for a while (Ctrl-C stops)

Slides
  record <title> [| notes]
  number <n>             number for the next recorded slide
  list                   show recorded slides
  dup <row>              copy a row right after itself as <n>.5
  del <row>              delete a row
  clear                  delete all rows, keep the timer

Editing
  edit <row> <field>     fields: number, title, start, end, notes
  draft <text>           replace the text being edited
  ok                     save the edit
  cancel                 discard the edit
  away                   leave the table (saves the edit)

Storage
  save                   save to the current record (named on first save)
  export [path]          write <lecture>_slides_<date>.json

  help, quit";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),

    #[error("'{command}' needs {what}")]
    MissingArgument {
        command: &'static str,
        what: &'static str,
    },

    #[error("'{0}' is not a row number")]
    BadIndex(String),

    #[error("unknown field '{0}', use number, title, start, end or notes")]
    BadField(String),

    #[error("'{0}' is not a number of seconds")]
    BadSeconds(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Start(Option<String>),
    Pause,
    Reset,
    Record { title: String, notes: String },
    Number(String),
    List,
    Duplicate(usize),
    Delete(usize),
    Edit(CellRef),
    Draft(String),
    Confirm,
    Cancel,
    Away,
    Time,
    Watch(u64),
    Clear,
    Save,
    Export(Option<PathBuf>),
    Help,
    Quit,
}

fn row(text: Option<&str>, command: &'static str) -> Result<usize, ParseError> {
    let text = text.ok_or(ParseError::MissingArgument {
        command,
        what: "a row number",
    })?;
    match text.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(ParseError::BadIndex(text.to_string())),
    }
}

/// Parse one input line. Blank lines parse to `None`.
pub fn parse_line(line: &str) -> Result<Option<ReplCommand>, ParseError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };
    let arg = (!rest.is_empty()).then_some(rest);

    let command = match word.to_ascii_lowercase().as_str() {
        "start" | "resume" => ReplCommand::Start(arg.map(str::to_string)),
        "pause" => ReplCommand::Pause,
        "reset" => ReplCommand::Reset,
        "record" | "rec" => {
            let (title, notes) = match rest.split_once('|') {
                Some((title, notes)) => (title.trim(), notes.trim()),
                None => (rest, ""),
            };
            ReplCommand::Record {
                title: title.to_string(),
                notes: notes.to_string(),
            }
        }
        "number" | "num" => ReplCommand::Number(
            arg.ok_or(ParseError::MissingArgument {
                command: "number",
                what: "a slide number",
            })?
            .to_string(),
        ),
        "list" | "ls" => ReplCommand::List,
        "dup" => ReplCommand::Duplicate(row(arg, "dup")?),
        "del" | "delete" => ReplCommand::Delete(row(arg, "del")?),
        "edit" => {
            let mut parts = rest.split_whitespace();
            let index = row(parts.next(), "edit")?;
            let field_text = parts.next().ok_or(ParseError::MissingArgument {
                command: "edit",
                what: "a field",
            })?;
            let field = field_text
                .parse::<SegmentField>()
                .map_err(|_| ParseError::BadField(field_text.to_string()))?;
            ReplCommand::Edit(CellRef::new(index, field))
        }
        "draft" => ReplCommand::Draft(rest.to_string()),
        "ok" => ReplCommand::Confirm,
        "cancel" => ReplCommand::Cancel,
        "away" => ReplCommand::Away,
        "time" | "status" => ReplCommand::Time,
        "watch" => {
            let secs = arg.ok_or(ParseError::MissingArgument {
                command: "watch",
                what: "a number of seconds",
            })?;
            ReplCommand::Watch(
                secs.parse()
                    .map_err(|_| ParseError::BadSeconds(secs.to_string()))?,
            )
        }
        "clear" => ReplCommand::Clear,
        "save" => ReplCommand::Save,
        "export" => ReplCommand::Export(arg.map(PathBuf::from)),
        "help" | "?" => ReplCommand::Help,
        "quit" | "exit" => ReplCommand::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

/// What the loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Watch(Duration),
    Quit,
}

/// Session state behind the prompt.
pub struct Repl<'a> {
    pub session: RecordingSession,
    store: &'a dyn RecordStore,
    user: String,
    record: Option<String>,
    saved: Vec<Segment>,
}

impl<'a> Repl<'a> {
    pub fn new(
        session: RecordingSession,
        store: &'a dyn RecordStore,
        user: impl Into<String>,
        record: Option<String>,
    ) -> Self {
        let saved = session.segments().to_vec();
        Self {
            session,
            store,
            user: user.into(),
            record,
            saved,
        }
    }

    pub fn record_name(&self) -> Option<&str> {
        self.record.as_deref()
    }

    /// Whether the slides differ from what was last loaded or saved.
    pub fn has_unsaved_changes(&self) -> bool {
        self.session.segments() != self.saved.as_slice()
    }

    fn lecture(&self) -> Result<String> {
        match self.session.lecture() {
            Some(lecture) => Ok(lecture.to_string()),
            None => bail!("Please select a lecture first"),
        }
    }

    pub fn execute(&mut self, command: ReplCommand, out: &mut dyn Write) -> Result<Flow> {
        debug!(?command, "repl command");
        match command {
            ReplCommand::Start(input) => {
                let started = match input {
                    Some(input) => self.session.start(&input)?,
                    None => self.session.start_from_input()?,
                };
                let verb = if started.resumed { "Resumed" } else { "Started" };
                writeln!(out, "{verb} at {}", self.session.current_time())?;
            }
            ReplCommand::Pause => match self.session.pause() {
                Some(anchor) => writeln!(out, "Paused at {anchor}")?,
                None => writeln!(out, "Timer is not running")?,
            },
            ReplCommand::Reset => {
                self.session.reset();
                writeln!(out, "Timer reset")?;
            }
            ReplCommand::Record { title, notes } => {
                let segment = self.session.record(&title, &notes)?;
                writeln!(
                    out,
                    "Slide {} recorded ({} - {})",
                    segment.number, segment.start_time, segment.end_time
                )?;
            }
            ReplCommand::Number(number) => {
                self.session.set_slide_number(number);
                writeln!(out, "Next slide: {}", self.session.next_number())?;
            }
            ReplCommand::List => self.print_table(out)?,
            ReplCommand::Duplicate(index) => {
                let copy = self.session.duplicate(index)?;
                writeln!(out, "Duplicated as slide {} (row {})", copy.number, index + 2)?;
            }
            ReplCommand::Delete(index) => {
                let removed = self.session.delete(index)?;
                writeln!(out, "Deleted slide {}", removed.number)?;
            }
            ReplCommand::Edit(cell) => {
                match self.session.begin_edit(cell)? {
                    BeginOutcome::Opened { committed } => {
                        if let Some(c) = committed {
                            report_saved(out, &c)?;
                        }
                    }
                    BeginOutcome::AlreadyEditing => {}
                }
                writeln!(
                    out,
                    "Editing row {} {}: {}",
                    cell.index + 1,
                    cell.field.label(),
                    self.session.display_value(cell)?
                )?;
            }
            ReplCommand::Draft(text) => {
                self.session.update_draft(text)?;
            }
            ReplCommand::Confirm => {
                let c = self.session.commit_edit()?;
                report_saved(out, &c)?;
            }
            ReplCommand::Cancel => match self.session.cancel_edit() {
                Some(c) => writeln!(
                    out,
                    "Kept row {} {}: {}",
                    c.cell.index + 1,
                    c.cell.field.label(),
                    c.restored
                )?,
                None => writeln!(out, "Nothing is being edited")?,
            },
            ReplCommand::Away => {
                if let Some(c) = self.session.focus(FocusTarget::Outside)? {
                    report_saved(out, &c)?;
                }
            }
            ReplCommand::Time => {
                let status = self.session.status();
                writeln!(
                    out,
                    "{}  {} [{}]  records: {}",
                    status.current_time, status.status, status.label, status.record_count
                )?;
            }
            ReplCommand::Watch(secs) => return Ok(Flow::Watch(Duration::from_secs(secs))),
            ReplCommand::Clear => {
                self.session.clear_records();
                writeln!(out, "All records cleared")?;
            }
            ReplCommand::Save => self.save(out)?,
            ReplCommand::Export(path) => {
                let doc = ExportDocument::new(self.lecture()?, self.session.segments().to_vec())?;
                let path = path.unwrap_or_else(|| PathBuf::from(doc.file_name()));
                doc.save(&path)?;
                writeln!(out, "Exported {} slides to {}", doc.records.len(), path.display())?;
            }
            ReplCommand::Help => writeln!(out, "{HELP}")?,
            ReplCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn save(&mut self, out: &mut dyn Write) -> Result<()> {
        if self.session.segments().is_empty() {
            bail!("No slides to save");
        }
        let lecture = self.lecture()?;
        let record = match &self.record {
            Some(record) => record.clone(),
            None => default_record_name(Local::now()),
        };

        let scope = ScopeKey::new(&self.user, &lecture, &record);
        self.store.save(&scope, self.session.segments())?;
        info!(%scope, "session saved");
        writeln!(out, "Records saved as \"{}\"", scope.record)?;
        self.record = Some(scope.record);
        self.saved = self.session.segments().to_vec();
        Ok(())
    }

    fn print_table(&self, out: &mut dyn Write) -> Result<()> {
        let segments = self.session.segments();
        if segments.is_empty() {
            writeln!(out, "No slides recorded")?;
            return Ok(());
        }

        writeln!(
            out,
            "{:>3}  {:<6} {:<24} {:<12} {:<12} {}",
            "#", "No.", "Title", "Start", "End", "Notes"
        )?;
        for (index, _) in segments.iter().enumerate() {
            let cell = |field| self.session.display_value(CellRef::new(index, field));
            writeln!(
                out,
                "{:>3}  {:<6} {:<24} {:<12} {:<12} {}",
                index + 1,
                cell(SegmentField::Number)?,
                cell(SegmentField::Title)?,
                cell(SegmentField::StartTime)?,
                cell(SegmentField::EndTime)?,
                cell(SegmentField::Notes)?,
            )?;
        }
        if let Some(edit) = self.session.editor().active() {
            writeln!(
                out,
                "(editing row {} {})",
                edit.cell.index + 1,
                edit.cell.field.label()
            )?;
        }
        Ok(())
    }
}

/// Follow the clock on one line until `duration` passes or Ctrl-C.
async fn watch(session: &RecordingSession, duration: Duration, refresh: Duration) -> Result<()> {
    let mut stdout = std::io::stdout();
    let mut ticker = tokio::time::interval(refresh.max(Duration::from_millis(1)));
    let deadline = tokio::time::sleep(duration);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = tokio::signal::ctrl_c() => break,
            _ = ticker.tick() => {
                let status = session.status();
                write!(stdout, "\r{}  {}   ", status.current_time, status.status)?;
                stdout.flush()?;
            }
        }
    }
    writeln!(stdout)?;
    Ok(())
}

/// Run the prompt until `quit` or end of input.
pub async fn run(mut repl: Repl<'_>, refresh: Duration) -> Result<()> {
    let lecture = repl.session.lecture().unwrap_or("-").to_string();
    println!("{}", "Slide Scribe".bright_cyan().bold());
    println!("{}", "━".repeat(40).bright_black());
    println!(
        "Lecture: {}  Record: {}",
        lecture,
        repl.record_name().unwrap_or("new")
    );
    println!("Type 'help' for commands, 'quit' to leave\n");

    let mut rl = DefaultEditor::new()?;
    let mut stdout = std::io::stdout();

    loop {
        let prompt = format!(
            "{} {}> ",
            repl.session.current_time(),
            repl.session.status().label.to_lowercase()
        );
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(_) => break,
        };
        let _ = rl.add_history_entry(line.as_str());

        let command = match parse_line(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(e) => {
                eprintln!("{} {}", "Error:".red(), e);
                continue;
            }
        };

        match repl.execute(command, &mut stdout) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Watch(duration)) => watch(&repl.session, duration, refresh).await?,
            Ok(Flow::Quit) => break,
            Err(e) => eprintln!("{} {:#}", "Error:".red(), e),
        }
    }

    if repl.has_unsaved_changes() {
        println!("{}", "Unsaved changes were discarded".yellow());
    }
    Ok(())
}

fn report_saved(out: &mut dyn Write, c: &Committed) -> std::io::Result<()> {
    writeln!(
        out,
        "Saved row {} {}: {}",
        c.cell.index + 1,
        c.cell.field.label(),
        c.value
    )
}
