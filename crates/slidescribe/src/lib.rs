//! Slide Scribe: slide timing for live presentations
//!
//! A presenter runs a session clock and marks each slide boundary as it
//! happens. The result is an ordered list of timed segments that can be
//! edited in place, saved per lecture, exported, and matched against the
//! lecture's subtitles.
//!
//! - **TimeCode**: `HH:MM:SS.mmm` text and its millisecond value
//! - **SessionTimer**: run/pause clock with an injectable wall clock
//! - **SegmentLedger**: the recorded segments
//! - **InlineEditController**: one cell edit at a time, validated on commit
//! - **RecordingSession**: owns all of the above for one front end

pub mod clock;
pub mod editor;
pub mod export;
pub mod ledger;
pub mod session;
pub mod store;
pub mod subtitles;
pub mod timecode;
pub mod timer;

pub use clock::{Clock, ManualClock, SystemClock};
pub use editor::{
    BeginOutcome, Cancelled, CellRef, Committed, EditError, EditSession, FocusTarget,
    InlineEditController,
};
pub use export::{export_file_name, AlignmentExport, ExportDocument};
pub use ledger::{
    leading_integer, LedgerError, Segment, SegmentField, SegmentLedger, UnknownField,
    ValidationError,
};
pub use session::{RecordingSession, SessionError, TimerStatus, Toggled};
pub use store::{
    default_record_name, validate_name, FileRecordStore, InMemoryRecordStore, RecordDocument,
    RecordStore, ScopeKey,
};
pub use subtitles::{
    align, parse_srt, parse_srt_time, AlignedSlide, Subtitle, SubtitleError, SubtitleSummary,
};
pub use timecode::{TimeCode, TimeCodeError};
pub use timer::{SegmentBounds, SessionTimer, Started, TimerError, TimerState};
