//! Single-editor inline editing of ledger cells
//!
//! At most one cell is open at a time. Opening a different cell commits the
//! open one first, so in-flight text is never silently dropped. Nothing
//! reaches the ledger until commit, and a commit that fails validation keeps
//! the cell open for another try.
//!
//! The presentation layer reports focus changes as [`FocusTarget`] events;
//! the controller never watches input devices itself.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::ledger::{LedgerError, SegmentField, SegmentLedger};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("no edit in progress")]
    NoActiveEdit,

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// One cell of the segment table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellRef {
    pub index: usize,
    pub field: SegmentField,
}

impl CellRef {
    pub fn new(index: usize, field: SegmentField) -> Self {
        Self { index, field }
    }
}

/// The edit currently open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub cell: CellRef,
    pub original: String,
    pub pending: String,
}

/// Where focus went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTarget {
    /// Another editable cell was activated
    Cell(CellRef),
    /// Interaction landed outside the editable table
    Outside,
}

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committed {
    pub cell: CellRef,
    pub value: String,
    pub changed: bool,
}

/// Result of a cancel: what the cell shows again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cancelled {
    pub cell: CellRef,
    pub restored: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeginOutcome {
    /// A new edit is open; `committed` holds the edit that was closed to make room
    Opened { committed: Option<Committed> },
    /// The requested cell was already open
    AlreadyEditing,
}

#[derive(Debug, Default)]
pub struct InlineEditController {
    active: Option<EditSession>,
}

impl InlineEditController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `cell` for editing, committing any other open cell first.
    ///
    /// If the implicit commit fails validation, the previous edit stays open
    /// and `cell` is not opened.
    pub fn begin(
        &mut self,
        ledger: &mut SegmentLedger,
        cell: CellRef,
    ) -> Result<BeginOutcome, EditError> {
        if self.is_editing(cell) {
            return Ok(BeginOutcome::AlreadyEditing);
        }

        // Make sure the target exists before touching the open edit
        ledger.get(cell.index)?;

        let committed = if self.active.is_some() {
            Some(self.commit(ledger)?)
        } else {
            None
        };

        let original = ledger.field_value(cell.index, cell.field)?;
        debug!(index = cell.index, field = %cell.field, "edit opened");
        self.active = Some(EditSession {
            cell,
            pending: original.clone(),
            original,
        });

        Ok(BeginOutcome::Opened { committed })
    }

    /// Replace the draft text of the open edit.
    pub fn update_draft(&mut self, value: impl Into<String>) -> Result<(), EditError> {
        let session = self.active.as_mut().ok_or(EditError::NoActiveEdit)?;
        session.pending = value.into();
        Ok(())
    }

    /// Write the draft to the ledger.
    pub fn commit(&mut self, ledger: &mut SegmentLedger) -> Result<Committed, EditError> {
        let session = self.active.as_ref().ok_or(EditError::NoActiveEdit)?;
        let cell = session.cell;

        match ledger.edit_field(cell.index, cell.field, &session.pending) {
            Ok(segment) => {
                let value = segment.field_text(cell.field);
                let changed = value != session.original;
                self.active = None;
                debug!(index = cell.index, field = %cell.field, changed, "edit committed");
                Ok(Committed {
                    cell,
                    value,
                    changed,
                })
            }
            Err(e) => {
                warn!(index = cell.index, field = %cell.field, error = %e, "edit rejected");
                Err(e.into())
            }
        }
    }

    /// Drop the draft and close the edit; the ledger is untouched.
    ///
    /// Returns `None` when nothing was open.
    pub fn cancel(&mut self) -> Option<Cancelled> {
        self.active.take().map(|session| {
            debug!(index = session.cell.index, field = %session.cell.field, "edit cancelled");
            Cancelled {
                cell: session.cell,
                restored: session.original,
            }
        })
    }

    /// Apply the focus policy: a new cell commits-then-opens, outside commits.
    ///
    /// Returns the commit that happened, if any.
    pub fn focus(
        &mut self,
        ledger: &mut SegmentLedger,
        target: FocusTarget,
    ) -> Result<Option<Committed>, EditError> {
        match target {
            FocusTarget::Cell(cell) => match self.begin(ledger, cell)? {
                BeginOutcome::Opened { committed } => Ok(committed),
                BeginOutcome::AlreadyEditing => Ok(None),
            },
            FocusTarget::Outside => {
                if self.active.is_some() {
                    self.commit(ledger).map(Some)
                } else {
                    Ok(None)
                }
            }
        }
    }

    pub fn active(&self) -> Option<&EditSession> {
        self.active.as_ref()
    }

    pub fn is_idle(&self) -> bool {
        self.active.is_none()
    }

    pub fn is_editing(&self, cell: CellRef) -> bool {
        self.active.as_ref().is_some_and(|s| s.cell == cell)
    }

    /// What `cell` shows right now: the draft while open, else the ledger value.
    pub fn display_value(
        &self,
        ledger: &SegmentLedger,
        cell: CellRef,
    ) -> Result<String, EditError> {
        match &self.active {
            Some(session) if session.cell == cell => Ok(session.pending.clone()),
            _ => Ok(ledger.field_value(cell.index, cell.field)?),
        }
    }
}
