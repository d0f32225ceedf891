use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::columns::types::{Assignee, CellValue, ColumnKey};
use crate::store::types::RowId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: RowId,
    pub priority: String,
    pub category: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub status: String,
    pub ticket_no: String,
    pub company: String,
    pub inquiry_details: String,
    pub notes: String,
    pub cs_manager: Option<Assignee>,
    pub qa_manager: Option<Assignee>,
    pub developer: Option<Assignee>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
}

/// Fields supplied when creating a row; the store assigns id and creation time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskDraft {
    pub priority: String,
    pub category: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub status: String,
    pub ticket_no: String,
    pub company: String,
    pub inquiry_details: String,
    pub notes: String,
    pub cs_manager: Option<Assignee>,
    pub qa_manager: Option<Assignee>,
    pub developer: Option<Assignee>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl TaskDraft {
    pub fn into_task(self, id: RowId, created_at: DateTime<Utc>) -> Task {
        Task {
            id,
            priority: self.priority,
            category: self.category,
            task_type: self.task_type,
            status: self.status,
            ticket_no: self.ticket_no,
            company: self.company,
            inquiry_details: self.inquiry_details,
            notes: self.notes,
            cs_manager: self.cs_manager,
            qa_manager: self.qa_manager,
            developer: self.developer,
            start_date: self.start_date,
            end_date: self.end_date,
            created_at,
        }
    }
}

/// A partial update: only the listed columns are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    pub changes: BTreeMap<ColumnKey, CellValue>,
}

impl TaskPatch {
    pub fn single(column: ColumnKey, value: CellValue) -> Self {
        let mut changes = BTreeMap::new();
        changes.insert(column, value);
        Self { changes }
    }

    pub fn get(&self, column: ColumnKey) -> Option<&CellValue> {
        self.changes.get(&column)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RowFilter {
    pub text: Option<String>,
    pub status: Option<String>,
    /// Matches a member id or the display text of an assignee in any role column.
    pub assignee: Option<String>,
}
