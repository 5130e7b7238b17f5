//! Run/pause session timer
//!
//! The timer keeps an anchor (`session_start_time`) plus accumulated run time.
//! While running, the current time is the anchor plus accumulated time plus
//! wall time since the run started. Pausing folds everything into a new
//! anchor so later arithmetic always starts from a single base.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::timecode::{TimeCode, TimeCodeError};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error(transparent)]
    InvalidTimeFormat(#[from] TimeCodeError),

    #[error("timer is already running")]
    AlreadyRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerState {
    Stopped,
    Running,
    Paused,
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerState::Stopped => write!(f, "stopped"),
            TimerState::Running => write!(f, "running"),
            TimerState::Paused => write!(f, "paused"),
        }
    }
}

/// What a successful `start` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Started {
    /// The timer was paused rather than stopped
    pub resumed: bool,
    /// The supplied start time replaced the anchor and cleared elapsed time
    pub reanchored: bool,
}

/// Start and end of the segment being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentBounds {
    pub start: TimeCode,
    pub end: TimeCode,
}

/// Session clock that accumulates run time across pauses.
pub struct SessionTimer {
    clock: Arc<dyn Clock>,

    state: TimerState,

    /// Run time not yet folded into the anchor
    elapsed_ms: u64,

    /// Session-clock origin, re-based on every pause
    session_start_time: TimeCode,

    /// Wall instant the current run began (Some only while running)
    run_started_at: Option<Instant>,

    /// Where the next recorded segment starts
    last_segment_start: Option<TimeCode>,
}

impl fmt::Debug for SessionTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTimer")
            .field("state", &self.state)
            .field("elapsed_ms", &self.elapsed_ms)
            .field("session_start_time", &self.session_start_time)
            .field("last_segment_start", &self.last_segment_start)
            .finish()
    }
}

impl Default for SessionTimer {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl SessionTimer {
    /// Create a stopped timer anchored at `00:00:00.000`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            state: TimerState::Stopped,
            elapsed_ms: 0,
            session_start_time: TimeCode::ZERO,
            run_started_at: None,
            last_segment_start: None,
        }
    }

    /// Start or resume from the start-time input.
    ///
    /// A start time different from the current anchor begins a fresh
    /// session: elapsed time is dropped and the next segment starts there.
    pub fn start(&mut self, start_time_input: &str) -> Result<Started, TimerError> {
        if self.state == TimerState::Running {
            return Err(TimerError::AlreadyRunning);
        }

        let start_time = TimeCode::parse(start_time_input)?;

        // Compare as text: "00:00:60.000" and "00:01:00.000" are different inputs
        let reanchored = start_time_input != self.session_start_time.to_string();
        if reanchored {
            self.elapsed_ms = 0;
            self.session_start_time = start_time;
            self.last_segment_start = Some(start_time);
        }

        let resumed = self.state == TimerState::Paused;
        self.state = TimerState::Running;
        self.run_started_at = Some(self.clock.now());

        debug!(
            start = %self.session_start_time,
            resumed,
            reanchored,
            "timer running"
        );

        Ok(Started {
            resumed,
            reanchored,
        })
    }

    /// Pause and fold accumulated time into the anchor.
    ///
    /// Returns the new anchor, or `None` if the timer was not running.
    pub fn pause(&mut self) -> Option<TimeCode> {
        if self.state != TimerState::Running {
            return None;
        }

        self.elapsed_ms += self.running_millis();
        self.run_started_at = None;

        self.session_start_time = self.session_start_time.saturating_add_millis(self.elapsed_ms);
        self.elapsed_ms = 0;
        self.state = TimerState::Paused;

        debug!(anchor = %self.session_start_time, "timer paused");
        Some(self.session_start_time)
    }

    /// Stop and return to `00:00:00.000`.
    pub fn reset(&mut self) {
        self.state = TimerState::Stopped;
        self.run_started_at = None;
        self.elapsed_ms = 0;
        self.session_start_time = TimeCode::ZERO;
        self.last_segment_start = None;
        debug!("timer reset");
    }

    /// Current position on the session clock.
    pub fn current_time(&self) -> TimeCode {
        self.session_start_time
            .saturating_add_millis(self.elapsed_ms + self.running_millis())
    }

    /// Close the segment in progress at the current time.
    ///
    /// The next segment will start where this one ends.
    pub fn mark_segment(&mut self) -> SegmentBounds {
        let end = self.current_time();
        let start = self.last_segment_start.unwrap_or(self.session_start_time);
        self.last_segment_start = Some(end);
        SegmentBounds { start, end }
    }

    fn running_millis(&self) -> u64 {
        match self.run_started_at {
            Some(started) => self
                .clock
                .now()
                .saturating_duration_since(started)
                .as_millis() as u64,
            None => 0,
        }
    }

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn session_start_time(&self) -> TimeCode {
        self.session_start_time
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    pub fn last_segment_start(&self) -> Option<TimeCode> {
        self.last_segment_start
    }

    /// The start-time input may only be edited while not running.
    pub fn start_time_editable(&self) -> bool {
        !self.is_running()
    }

    /// Label for the start/pause toggle.
    pub fn toggle_label(&self) -> &'static str {
        match self.state {
            TimerState::Stopped => "Start",
            TimerState::Running => "Pause",
            TimerState::Paused => "Resume",
        }
    }

    pub fn status_text(&self) -> &'static str {
        match self.state {
            TimerState::Stopped => "Ready to Start",
            TimerState::Running => "Timer Running",
            TimerState::Paused => "Timer Paused",
        }
    }
}
