//! End-to-end recording flows
//!
//! Drives a RecordingSession with a manual clock, then saves, reloads,
//! exports and aligns the result.

use std::sync::Arc;

use slidescribe::{
    align, parse_srt, BeginOutcome, CellRef, EditError, ExportDocument, FileRecordStore,
    FocusTarget, LedgerError, ManualClock, RecordStore, RecordingSession, ScopeKey, SegmentField,
    SessionError, TimeCode, TimerState, ValidationError,
};
use tempfile::TempDir;

fn session() -> (RecordingSession, ManualClock) {
    let clock = ManualClock::new();
    let session = RecordingSession::new(Arc::new(clock.clone())).with_lecture("Physics 101");
    (session, clock)
}

#[test]
fn record_across_pause_and_resume() {
    let (mut session, clock) = session();

    session.start("00:00:00.000").unwrap();
    clock.advance_millis(1_500);
    let intro = session.record("Intro", "").unwrap().clone();
    assert_eq!(intro.start_time.to_string(), "00:00:00.000");
    assert_eq!(intro.end_time.to_string(), "00:00:01.500");

    session.pause();
    clock.advance_millis(60_000);
    let resumed = session.start_from_input().unwrap();
    assert!(resumed.resumed);

    clock.advance_millis(2_500);
    let topic = session.record("Topic 2", "").unwrap().clone();
    assert_eq!(topic.start_time.to_string(), "00:00:01.500");
    assert_eq!(topic.end_time.to_string(), "00:00:04.000");
    assert_eq!(topic.number, "2");
}

#[test]
fn duplicate_then_edit_then_switch_cells() {
    let (mut session, clock) = session();
    session.start("00:00:00.000").unwrap();
    session.set_slide_number("3");
    clock.advance_millis(1_000);
    session.record("Three", "").unwrap();
    clock.advance_millis(1_000);
    session.record("Four", "").unwrap();

    let copy = session.duplicate(0).unwrap();
    assert_eq!(copy.number, "3.5");
    assert_eq!(session.segments().len(), 3);
    assert_eq!(session.segments()[2].title, "Four");

    let a = CellRef::new(1, SegmentField::Title);
    let b = CellRef::new(2, SegmentField::Notes);
    session.begin_edit(a).unwrap();
    session.update_draft("Three, continued").unwrap();

    let outcome = session.begin_edit(b).unwrap();
    assert!(matches!(outcome, BeginOutcome::Opened { committed: Some(_) }));
    assert_eq!(session.segments()[1].title, "Three, continued");

    session.update_draft("wrap up").unwrap();
    session.focus(FocusTarget::Outside).unwrap();
    assert_eq!(session.segments()[2].notes, "wrap up");
    assert!(session.editor().is_idle());
}

#[test]
fn malformed_time_edit_is_rejected() {
    let (mut session, clock) = session();
    session.start("00:00:00.000").unwrap();
    clock.advance_millis(750);
    session.record("Only", "").unwrap();

    let cell = CellRef::new(0, SegmentField::StartTime);
    session.begin_edit(cell).unwrap();
    session.update_draft("12:34:56").unwrap();

    let err = session.commit_edit().unwrap_err();
    assert!(matches!(
        err,
        SessionError::Edit(EditError::Ledger(LedgerError::Validation(
            ValidationError::InvalidTime { .. }
        )))
    ));
    assert_eq!(session.segments()[0].start_time, TimeCode::ZERO);
    assert!(session.editor().is_editing(cell));

    let cancelled = session.cancel_edit().unwrap();
    assert_eq!(cancelled.restored, "00:00:00.000");
}

#[test]
fn reset_tears_down_everything() {
    let (mut session, clock) = session();
    session.start("00:02:00.000").unwrap();
    clock.advance_millis(5_000);
    session.record("Intro", "").unwrap();
    session
        .begin_edit(CellRef::new(0, SegmentField::Title))
        .unwrap();

    session.reset();
    let status = session.status();
    assert_eq!(status.state, TimerState::Stopped);
    assert_eq!(status.current_time, TimeCode::ZERO);
    assert_eq!(status.record_count, 0);
    assert_eq!(status.label, "Start");
    assert!(session.editor().is_idle());
}

#[test]
fn save_reload_export_and_align() {
    let dir = TempDir::new().unwrap();
    let store = FileRecordStore::new(dir.path());
    let (mut session, clock) = session();

    session.start("00:00:00.000").unwrap();
    clock.advance_millis(2_000);
    session.record("Welcome", "say hi").unwrap();
    clock.advance_millis(3_000);
    session.record("Agenda", "").unwrap();

    let scope = ScopeKey::new("alice", "Physics 101", "take1");
    store.save(&scope, session.segments()).unwrap();

    let (mut reloaded, _clock) = self::session();
    reloaded.load_segments(store.load(&scope).unwrap().unwrap());
    assert_eq!(reloaded.segments(), session.segments());

    let export = ExportDocument::new("Physics 101", reloaded.segments().to_vec()).unwrap();
    assert!(export.file_name().starts_with("Physics 101_slides_"));

    let srt = "1\n00:00:00,200 --> 00:00:01,900\nHello and welcome\n\n\
               2\n00:00:02,100 --> 00:00:04,800\nHere is the plan\n";
    let aligned = align(&parse_srt(srt), reloaded.segments());
    assert_eq!(aligned.len(), 2);
    assert_eq!(aligned[0].notes, "say hi");
    assert_eq!(aligned[1].text, "Here is the plan");
}
