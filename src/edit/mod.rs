//! Cell edit controller. Owns the single active edit session of a client and
//! turns input events into [`EditEffect`]s; it performs no I/O itself.

pub mod types;

use std::mem;

use chrono::NaiveDate;

use crate::choices::{resolve_assignee, Selection};
use crate::columns::types::{CellKey, CellValue, ColumnKey, ColumnKind, CommitPolicy};
use crate::columns;
use crate::error::{AppError, AppResult, ValidationError};
use crate::options::types::OptionLists;
use crate::store::types::RowId;
use crate::subflow::types::{SubflowKind, SubflowRequest};
use crate::tasks::types::Task;
use types::{CloseReason, EditEffect, EditKey, EditSession, EditState};

/// Maps a non-sentinel selection onto the value stored in a cell of `kind`
/// that currently holds `current`.
///
/// Select cells only take live list entries. Picking the cell's own value
/// back (including a "(removed)" placeholder) yields `current` unchanged, so
/// the commit closes as `Unchanged`. A member cell whose assignee was removed
/// from the registry keeps its member reference when that id is picked again.
pub fn selection_value(
    column: ColumnKey,
    kind: ColumnKind,
    value: &str,
    current: &CellValue,
    lists: &OptionLists,
) -> AppResult<CellValue> {
    match kind {
        ColumnKind::Select(list) => {
            if current.as_text() == Some(value) || lists.list(list).iter().any(|entry| entry == value) {
                Ok(CellValue::Text(value.to_owned()))
            } else {
                Err(ValidationError::NotAnOption {
                    list,
                    value: value.to_owned(),
                }
                .into())
            }
        }
        ColumnKind::Member => {
            if let CellValue::Assignee(Some(assignee)) = current {
                if lists.member(value).is_none() && assignee.member_id() == Some(value.trim()) {
                    return Ok(current.clone());
                }
            }
            Ok(CellValue::Assignee(resolve_assignee(value, lists)))
        }
        ColumnKind::Date | ColumnKind::Text { .. } | ColumnKind::ReadOnly => {
            Err(ValidationError::TypeMismatch(column).into())
        }
    }
}

/// The sub-flow a sentinel launches for a column of `kind`.
pub fn sentinel_subflow(column: ColumnKey, kind: ColumnKind, selection: &Selection) -> AppResult<Option<SubflowKind>> {
    match (kind, selection) {
        (_, Selection::Value(_)) => Ok(None),
        (ColumnKind::Select(list), Selection::CreateNewOption) => Ok(Some(SubflowKind::AddOption(list))),
        (ColumnKind::Member, Selection::InviteUser) => Ok(Some(SubflowKind::Invite)),
        _ => Err(ValidationError::TypeMismatch(column).into()),
    }
}

#[derive(Debug, Default)]
pub struct EditController {
    state: EditState,
}

impl EditController {
    pub fn state(&self) -> &EditState {
        &self.state
    }

    pub fn session(&self) -> Option<&EditSession> {
        match &self.state {
            EditState::Editing(session) => Some(session),
            EditState::Idle => None,
        }
    }

    pub fn is_editing(&self, cell: &CellKey) -> bool {
        self.session().is_some_and(|session| &session.cell == cell)
    }

    fn session_mut(&mut self) -> AppResult<&mut EditSession> {
        match &mut self.state {
            EditState::Editing(session) => Ok(session),
            EditState::Idle => Err(AppError::NotEditing),
        }
    }

    /// Ends the active session. Touched free text is flushed, never dropped.
    fn close(&mut self, reason: CloseReason) -> Vec<EditEffect> {
        let EditState::Editing(session) = mem::take(&mut self.state) else {
            return Vec::new();
        };
        let mut effects = Vec::new();
        let reason = match reason {
            CloseReason::Cancelled | CloseReason::Orphaned => {
                effects.push(EditEffect::DiscardPending(session.cell.clone()));
                reason
            }
            _ if session.touched => {
                effects.push(EditEffect::ForceSave {
                    cell: session.cell.clone(),
                    value: session.working,
                });
                match reason {
                    CloseReason::Unchanged => CloseReason::Committed,
                    other => other,
                }
            }
            _ => reason,
        };
        effects.push(EditEffect::Closed {
            cell: session.cell,
            reason,
        });
        effects
    }

    /// Opens `column` of `row` for editing (the double-click transition).
    pub fn begin(&mut self, row: &Task, column: ColumnKey) -> AppResult<Vec<EditEffect>> {
        let kind = columns::kind_of(column);
        if !kind.is_editable() {
            return Err(AppError::NotEditable(column));
        }
        let cell = CellKey::new(row.id.clone(), column);
        if self.is_editing(&cell) {
            return Ok(Vec::new());
        }

        let effects = self.close(CloseReason::Superseded);
        let value = row.value(column);
        self.state = EditState::Editing(EditSession {
            cell,
            kind,
            working: value.clone(),
            original: value,
            touched: false,
        });
        Ok(effects)
    }

    /// A keystroke in a free-text session; replaces the working text.
    pub fn input(&mut self, text: impl Into<String>) -> AppResult<Vec<EditEffect>> {
        let session = self.session_mut()?;
        if session.kind.commit_policy() != CommitPolicy::Debounced {
            return Err(ValidationError::TypeMismatch(session.cell.column).into());
        }
        session.working = CellValue::Text(text.into());
        session.touched = true;
        Ok(vec![EditEffect::ScheduleSave {
            cell: session.cell.clone(),
            value: session.working.clone(),
        }])
    }

    pub fn key(&mut self, key: EditKey) -> Vec<EditEffect> {
        match key {
            EditKey::Enter { shift: true } => Vec::new(),
            EditKey::Enter { shift: false } => self.close(CloseReason::Unchanged),
            EditKey::Escape => self.close(CloseReason::Cancelled),
        }
    }

    pub fn blur(&mut self) -> Vec<EditEffect> {
        self.close(CloseReason::Unchanged)
    }

    /// A pick in a select or member cell. Plain values commit immediately;
    /// sentinels open a sub-flow and leave the session untouched.
    pub fn select(&mut self, selection: Selection, lists: &OptionLists) -> AppResult<Vec<EditEffect>> {
        let session = self.session_mut()?;
        let column = session.cell.column;
        if let Some(kind) = sentinel_subflow(column, session.kind, &selection)? {
            return Ok(vec![EditEffect::OpenSubflow(SubflowRequest {
                kind,
                origin: session.cell.clone(),
                from_edit_session: true,
            })]);
        }
        let Selection::Value(value) = selection else {
            return Ok(Vec::new());
        };
        let value = selection_value(column, session.kind, &value, &session.original, lists)?;
        Ok(self.commit(value))
    }

    pub fn set_date(&mut self, date: Option<NaiveDate>) -> AppResult<Vec<EditEffect>> {
        let session = self.session_mut()?;
        if session.kind != ColumnKind::Date {
            return Err(ValidationError::TypeMismatch(session.cell.column).into());
        }
        Ok(self.commit(CellValue::Date(date)))
    }

    fn commit(&mut self, value: CellValue) -> Vec<EditEffect> {
        let EditState::Editing(session) = mem::take(&mut self.state) else {
            return Vec::new();
        };
        if value == session.original {
            return vec![EditEffect::Closed {
                cell: session.cell,
                reason: CloseReason::Unchanged,
            }];
        }
        vec![
            EditEffect::ForceSave {
                cell: session.cell.clone(),
                value,
            },
            EditEffect::Closed {
                cell: session.cell,
                reason: CloseReason::Committed,
            },
        ]
    }

    /// Treats a session whose row vanished from `rows` as an implicit cancel.
    pub fn reconcile(&mut self, rows: &[Task]) -> Vec<EditEffect> {
        let orphaned = self
            .session()
            .is_some_and(|session| !rows.iter().any(|task| task.id == session.cell.row_id));
        if orphaned {
            self.close(CloseReason::Orphaned)
        } else {
            Vec::new()
        }
    }

    pub fn abandon_row(&mut self, row_id: &RowId) -> Vec<EditEffect> {
        if self.session().is_some_and(|session| &session.cell.row_id == row_id) {
            self.close(CloseReason::Orphaned)
        } else {
            Vec::new()
        }
    }

    /// Closes the session on unmount, flushing touched text when `flush` is set.
    pub fn unmount(&mut self, flush: bool) -> Vec<EditEffect> {
        if flush {
            self.close(CloseReason::Unmounted)
        } else {
            let effects = self.close(CloseReason::Cancelled);
            effects
                .into_iter()
                .map(|effect| match effect {
                    EditEffect::Closed { cell, .. } => EditEffect::Closed {
                        cell,
                        reason: CloseReason::Unmounted,
                    },
                    other => other,
                })
                .collect()
        }
    }
}
