//! One recording session: timer, ledger, editor and slide counter
//!
//! [`RecordingSession`] is the single owner of all session state. Front ends
//! call into it with `&mut` and read back a [`TimerStatus`] snapshot for
//! display. Operations that restructure the ledger (reset, load, delete,
//! duplicate, clear) close any open edit before touching rows, so an edit
//! never points at a row that moved.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::editor::{
    BeginOutcome, Cancelled, CellRef, Committed, EditError, FocusTarget, InlineEditController,
};
use crate::ledger::{leading_integer, LedgerError, Segment, SegmentLedger};
use crate::timecode::TimeCode;
use crate::timer::{SessionTimer, Started, TimerError, TimerState};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("no lecture selected")]
    NoLectureSelected,

    #[error(transparent)]
    Timer(#[from] TimerError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    Edit(#[from] EditError),
}

/// Display snapshot of the timer and ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimerStatus {
    pub state: TimerState,
    pub current_time: TimeCode,
    pub label: &'static str,
    pub status: &'static str,
    pub record_count: usize,
}

/// What `toggle` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggled {
    Started(Started),
    Paused(TimeCode),
}

const FIRST_SLIDE: &str = "1";

pub struct RecordingSession {
    timer: SessionTimer,
    ledger: SegmentLedger,
    editor: InlineEditController,

    /// Number the next recorded segment gets
    next_number: String,

    /// Text of the start-time input; follows the anchor on pause
    start_input: String,

    lecture: Option<String>,
}

impl std::fmt::Debug for RecordingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingSession")
            .field("timer", &self.timer)
            .field("records", &self.ledger.len())
            .field("editing", &self.editor.active().map(|s| s.cell))
            .field("next_number", &self.next_number)
            .field("lecture", &self.lecture)
            .finish()
    }
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl RecordingSession {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            timer: SessionTimer::new(clock),
            ledger: SegmentLedger::new(),
            editor: InlineEditController::new(),
            next_number: FIRST_SLIDE.to_string(),
            start_input: TimeCode::ZERO.to_string(),
            lecture: None,
        }
    }

    /// Pre-fill the start-time input, e.g. from configuration.
    pub fn with_start_input(mut self, input: impl Into<String>) -> Self {
        self.start_input = input.into();
        self
    }

    pub fn with_lecture(mut self, lecture: impl Into<String>) -> Self {
        self.lecture = Some(lecture.into());
        self
    }

    pub fn lecture(&self) -> Option<&str> {
        self.lecture.as_deref()
    }

    // --- timer -----------------------------------------------------------

    /// Start or resume from `input`.
    pub fn start(&mut self, input: &str) -> Result<Started, SessionError> {
        let started = self.timer.start(input)?;
        self.start_input = input.to_string();
        Ok(started)
    }

    /// Start or resume from the current start-time input.
    pub fn start_from_input(&mut self) -> Result<Started, SessionError> {
        let input = self.start_input.clone();
        self.start(&input)
    }

    /// Pause; the start-time input follows the new anchor.
    pub fn pause(&mut self) -> Option<TimeCode> {
        let anchor = self.timer.pause()?;
        self.start_input = anchor.to_string();
        Some(anchor)
    }

    /// Pause if running, otherwise start from `input`.
    pub fn toggle(&mut self, input: &str) -> Result<Toggled, SessionError> {
        if self.timer.is_running() {
            let anchor = self.pause().unwrap_or_else(|| self.timer.current_time());
            Ok(Toggled::Paused(anchor))
        } else {
            self.start(input).map(Toggled::Started)
        }
    }

    /// Stop the timer, drop every segment and start numbering again.
    pub fn reset(&mut self) {
        self.editor.cancel();
        self.timer.reset();
        self.ledger.clear();
        self.next_number = FIRST_SLIDE.to_string();
        self.start_input = TimeCode::ZERO.to_string();
        info!("session reset");
    }

    pub fn current_time(&self) -> TimeCode {
        self.timer.current_time()
    }

    pub fn start_input(&self) -> &str {
        &self.start_input
    }

    /// Replace the start-time input; ignored while running.
    pub fn set_start_input(&mut self, input: impl Into<String>) -> bool {
        if !self.timer.start_time_editable() {
            return false;
        }
        self.start_input = input.into();
        true
    }

    pub fn timer(&self) -> &SessionTimer {
        &self.timer
    }

    pub fn status(&self) -> TimerStatus {
        TimerStatus {
            state: self.timer.state(),
            current_time: self.timer.current_time(),
            label: self.timer.toggle_label(),
            status: self.timer.status_text(),
            record_count: self.ledger.len(),
        }
    }

    // --- ledger ----------------------------------------------------------

    /// Record the segment ending now under the pending slide number.
    ///
    /// Title and notes are trimmed. The slide number advances to the
    /// integer part plus one.
    pub fn record(&mut self, title: &str, notes: &str) -> Result<&Segment, SessionError> {
        if self.lecture.is_none() {
            return Err(SessionError::NoLectureSelected);
        }

        let number = std::mem::take(&mut self.next_number);
        self.next_number = match leading_integer(&number) {
            Some(n) => (n + 1).to_string(),
            None => number.clone(),
        };

        Ok(self
            .ledger
            .record(&mut self.timer, title.trim(), number, notes.trim()))
    }

    pub fn next_number(&self) -> &str {
        &self.next_number
    }

    pub fn set_slide_number(&mut self, number: impl Into<String>) {
        self.next_number = number.into();
    }

    pub fn duplicate(&mut self, index: usize) -> Result<&Segment, SessionError> {
        self.ledger.get(index)?;
        self.editor.cancel();
        Ok(self.ledger.duplicate(index)?)
    }

    pub fn delete(&mut self, index: usize) -> Result<Segment, SessionError> {
        self.ledger.get(index)?;
        self.editor.cancel();
        Ok(self.ledger.delete(index)?)
    }

    /// Drop all segments; the timer keeps running.
    pub fn clear_records(&mut self) {
        self.editor.cancel();
        self.ledger.clear();
        info!("records cleared");
    }

    /// Replace the ledger with a saved record.
    pub fn load_segments(&mut self, segments: Vec<Segment>) {
        self.editor.cancel();
        debug!(count = segments.len(), "segments loaded");
        self.ledger.replace(segments);
    }

    pub fn segments(&self) -> &[Segment] {
        self.ledger.segments()
    }

    pub fn ledger(&self) -> &SegmentLedger {
        &self.ledger
    }

    // --- editing ---------------------------------------------------------

    pub fn begin_edit(&mut self, cell: CellRef) -> Result<BeginOutcome, SessionError> {
        Ok(self.editor.begin(&mut self.ledger, cell)?)
    }

    pub fn update_draft(&mut self, value: impl Into<String>) -> Result<(), SessionError> {
        Ok(self.editor.update_draft(value)?)
    }

    pub fn commit_edit(&mut self) -> Result<Committed, SessionError> {
        Ok(self.editor.commit(&mut self.ledger)?)
    }

    pub fn cancel_edit(&mut self) -> Option<Cancelled> {
        self.editor.cancel()
    }

    pub fn focus(&mut self, target: FocusTarget) -> Result<Option<Committed>, SessionError> {
        Ok(self.editor.focus(&mut self.ledger, target)?)
    }

    pub fn editor(&self) -> &InlineEditController {
        &self.editor
    }

    pub fn display_value(&self, cell: CellRef) -> Result<String, SessionError> {
        Ok(self.editor.display_value(&self.ledger, cell)?)
    }
}
