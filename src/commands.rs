//! Front-end command surface over [`EditableGrid`]. Arguments arrive as
//! plain strings and results are serializable, so any shell (terminal,
//! webview bridge, RPC) can drive the grid through the same functions.

use chrono::NaiveDate;
use serde::Serialize;

use crate::choices::{Choice, Selection};
use crate::columns::types::ColumnKey;
use crate::edit::types::EditKey;
use crate::error::{AppError, AppResult};
use crate::grid::{EditableGrid, RowView};
use crate::options::types::Member;
use crate::store::types::RowId;
use crate::subflow::types::SubflowRequest;
use crate::tasks::types::{RowFilter, TaskDraft};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskResult {
    pub id: RowId,
}

fn parse_column(column: &str) -> AppResult<ColumnKey> {
    ColumnKey::parse(column).ok_or_else(|| AppError::Usage(format!("unknown column '{column}'")))
}

pub fn list_tasks(grid: &EditableGrid) -> RowView {
    grid.view()
}

pub fn export_tasks(grid: &EditableGrid) -> AppResult<String> {
    Ok(serde_json::to_string_pretty(&grid.view())?)
}

pub async fn create_task(
    grid: &EditableGrid,
    ticket_no: String,
    company: String,
) -> AppResult<CreateTaskResult> {
    let id = grid
        .create_task(TaskDraft {
            ticket_no,
            company,
            ..TaskDraft::default()
        })
        .await?;
    Ok(CreateTaskResult { id })
}

pub async fn delete_task(grid: &EditableGrid, task_id: String) -> AppResult<()> {
    grid.delete_task(&RowId::from(task_id)).await
}

pub fn set_filter(grid: &EditableGrid, text: String) {
    let text = text.trim();
    grid.set_filter(RowFilter {
        text: (!text.is_empty()).then(|| text.to_owned()),
        ..RowFilter::default()
    });
}

pub async fn begin_edit(grid: &EditableGrid, task_id: String, column: String) -> AppResult<()> {
    let column = parse_column(&column)?;
    grid.begin_edit(&RowId::from(task_id), column).await
}

pub async fn type_text(grid: &EditableGrid, text: String) -> AppResult<()> {
    grid.input(&text).await
}

/// `enter`, `newline` (shift+enter), `esc` or `blur`.
pub async fn press_key(grid: &EditableGrid, key: &str) -> AppResult<()> {
    match key {
        "enter" => grid.key(EditKey::Enter { shift: false }).await,
        "newline" => grid.key(EditKey::Enter { shift: true }).await,
        "esc" => grid.key(EditKey::Escape).await,
        "blur" => grid.blur().await,
        other => Err(AppError::Usage(format!("unknown key '{other}'"))),
    }
}

pub fn cell_choices(grid: &EditableGrid) -> AppResult<Vec<Choice>> {
    let session = grid.edit_session().ok_or(AppError::NotEditing)?;
    grid.choices(&session.cell.row_id, session.cell.column)
}

/// Picks a choice in the open cell. `+new` and `+invite` are the sentinels;
/// returns the sub-flow they opened, if any.
pub async fn pick(grid: &EditableGrid, value: String) -> AppResult<Option<SubflowRequest>> {
    let selection = match value.as_str() {
        "+new" => Selection::CreateNewOption,
        "+invite" => Selection::InviteUser,
        _ => Selection::Value(value),
    };
    grid.select(selection).await?;
    Ok(grid.subflow())
}

/// Sets the open date cell from `YYYY-MM-DD`; blank or `none` clears it.
pub async fn set_date(grid: &EditableGrid, raw: String) -> AppResult<()> {
    let date = match raw.trim() {
        "" | "none" => None,
        raw => Some(
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map_err(|error| AppError::Usage(format!("invalid date '{raw}': {error}")))?,
        ),
    };
    grid.set_date(date).await
}

pub async fn complete_add_option(grid: &EditableGrid, value: String) -> AppResult<String> {
    grid.complete_add_option(&value).await
}

pub async fn complete_invite(grid: &EditableGrid, address: String) -> AppResult<Member> {
    grid.complete_invite(&address).await
}

pub fn cancel_subflow(grid: &EditableGrid) -> AppResult<()> {
    grid.cancel_subflow()
}
