pub mod types;

use crate::columns::types::{Assignee, CellValue, ColumnKey};
use crate::columns::{self, types::ColumnKind};
use crate::error::ValidationError;
use types::{RowFilter, Task, TaskDraft, TaskPatch};

impl Task {
    pub fn value(&self, column: ColumnKey) -> CellValue {
        match column {
            ColumnKey::Priority => CellValue::Text(self.priority.clone()),
            ColumnKey::Category => CellValue::Text(self.category.clone()),
            ColumnKey::Type => CellValue::Text(self.task_type.clone()),
            ColumnKey::Status => CellValue::Text(self.status.clone()),
            ColumnKey::TicketNo => CellValue::Text(self.ticket_no.clone()),
            ColumnKey::Company => CellValue::Text(self.company.clone()),
            ColumnKey::InquiryDetails => CellValue::Text(self.inquiry_details.clone()),
            ColumnKey::Notes => CellValue::Text(self.notes.clone()),
            ColumnKey::CsManager => CellValue::Assignee(self.cs_manager.clone()),
            ColumnKey::QaManager => CellValue::Assignee(self.qa_manager.clone()),
            ColumnKey::Developer => CellValue::Assignee(self.developer.clone()),
            ColumnKey::StartDate => CellValue::Date(self.start_date),
            ColumnKey::EndDate => CellValue::Date(self.end_date),
            ColumnKey::CreatedAt => {
                CellValue::Text(self.created_at.format("%Y-%m-%d %H:%M").to_string())
            }
        }
    }

    pub fn set(&mut self, column: ColumnKey, value: CellValue) -> Result<(), ValidationError> {
        match (column, value) {
            (ColumnKey::Priority, CellValue::Text(text)) => self.priority = text,
            (ColumnKey::Category, CellValue::Text(text)) => self.category = text,
            (ColumnKey::Type, CellValue::Text(text)) => self.task_type = text,
            (ColumnKey::Status, CellValue::Text(text)) => self.status = text,
            (ColumnKey::TicketNo, CellValue::Text(text)) => self.ticket_no = text,
            (ColumnKey::Company, CellValue::Text(text)) => self.company = text,
            (ColumnKey::InquiryDetails, CellValue::Text(text)) => self.inquiry_details = text,
            (ColumnKey::Notes, CellValue::Text(text)) => self.notes = text,
            (ColumnKey::CsManager, CellValue::Assignee(who)) => self.cs_manager = who,
            (ColumnKey::QaManager, CellValue::Assignee(who)) => self.qa_manager = who,
            (ColumnKey::Developer, CellValue::Assignee(who)) => self.developer = who,
            (ColumnKey::StartDate, CellValue::Date(date)) => self.start_date = date,
            (ColumnKey::EndDate, CellValue::Date(date)) => self.end_date = date,
            (column, _) => return Err(ValidationError::TypeMismatch(column)),
        }
        Ok(())
    }

    pub fn apply(&mut self, patch: &TaskPatch) -> Result<(), ValidationError> {
        for (column, value) in &patch.changes {
            self.set(*column, value.clone())?;
        }
        Ok(())
    }

    /// A row is completed iff its status equals the workspace's terminal status.
    pub fn is_completed(&self, terminal_status: Option<&str>) -> bool {
        terminal_status.is_some_and(|terminal| self.status == terminal)
    }

    fn assignees(&self) -> impl Iterator<Item = &Assignee> {
        [&self.cs_manager, &self.qa_manager, &self.developer]
            .into_iter()
            .flatten()
    }

    pub fn matches(&self, filter: &RowFilter) -> bool {
        if let Some(status) = &filter.status {
            if &self.status != status {
                return false;
            }
        }
        if let Some(who) = &filter.assignee {
            let found = self
                .assignees()
                .any(|assignee| assignee.member_id() == Some(who.as_str()) || assignee.display() == who);
            if !found {
                return false;
            }
        }
        match filter.text.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                [
                    &self.ticket_no,
                    &self.company,
                    &self.inquiry_details,
                    &self.notes,
                    &self.category,
                    &self.task_type,
                ]
                .into_iter()
                .chain(self.assignees().map(|assignee| match assignee {
                    Assignee::Member { label, .. } => label,
                    Assignee::External { name } => name,
                }))
                .any(|field| field.to_lowercase().contains(&needle))
            }
        }
    }
}

/// Rejects values that may not be persisted into `column`.
pub fn validate_cell(column: ColumnKey, value: &CellValue) -> Result<(), ValidationError> {
    let kind = columns::kind_of(column);
    let fits = matches!(
        (kind, value),
        (ColumnKind::Select(_) | ColumnKind::Text { .. }, CellValue::Text(_))
            | (ColumnKind::Member, CellValue::Assignee(_))
            | (ColumnKind::Date, CellValue::Date(_))
    );
    if !fits {
        return Err(ValidationError::TypeMismatch(column));
    }
    if columns::is_required(column) && value.as_text().is_some_and(|text| text.trim().is_empty()) {
        return Err(ValidationError::Required(column));
    }
    Ok(())
}

pub fn validate_draft(draft: &TaskDraft) -> Result<(), ValidationError> {
    if draft.ticket_no.trim().is_empty() {
        return Err(ValidationError::Required(ColumnKey::TicketNo));
    }
    Ok(())
}

/// Splits rows into (active, completed) by the terminal status.
pub fn partition<'a>(rows: &'a [Task], terminal_status: Option<&str>) -> (Vec<&'a Task>, Vec<&'a Task>) {
    rows.iter().partition(|task| !task.is_completed(terminal_status))
}

pub fn newest_first(rows: &mut [&Task]) {
    rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}


#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};

    use super::fixtures::task;
    use super::*;

    #[test]
    fn completed_iff_status_equals_terminal() {
        let rows = vec![task("a", "In progress"), task("b", "Complete"), task("c", "QA")];
        let (active, completed) = partition(&rows, Some("Complete"));
        assert_eq!(
            active.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(),
            vec!["a", "c"]
        );
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id.as_str(), "b");

        let (active, completed) = partition(&rows, None);
        assert_eq!(active.len(), 3);
        assert!(completed.is_empty());
    }

    #[test]
    fn set_rejects_mismatched_cell_values() {
        let mut row = task("a", "QA");
        let err = row
            .set(ColumnKey::StartDate, CellValue::Text("tomorrow".into()))
            .expect_err("text is not a date");
        assert_eq!(err, ValidationError::TypeMismatch(ColumnKey::StartDate));

        let date = NaiveDate::from_ymd_opt(2024, 5, 2);
        row.set(ColumnKey::StartDate, CellValue::Date(date)).expect("date fits");
        assert_eq!(row.value(ColumnKey::StartDate), CellValue::Date(date));

        let err = row
            .set(ColumnKey::CreatedAt, CellValue::Text("now".into()))
            .expect_err("createdAt is immutable");
        assert_eq!(err, ValidationError::TypeMismatch(ColumnKey::CreatedAt));
    }

    #[test]
    fn blank_ticket_number_is_rejected() {
        assert_eq!(
            validate_cell(ColumnKey::TicketNo, &CellValue::Text("  ".into())),
            Err(ValidationError::Required(ColumnKey::TicketNo))
        );
        assert!(validate_cell(ColumnKey::Notes, &CellValue::Text(String::new())).is_ok());
        assert!(validate_draft(&TaskDraft::default()).is_err());
    }

    #[test]
    fn filter_searches_text_and_assignees() {
        let mut row = task("a", "QA");
        row.notes = "Customer asked for a refund".into();
        row.developer = Some(Assignee::Member {
            id: "u-7".into(),
            label: "Dana".into(),
        });

        let by_text = RowFilter {
            text: Some("REFUND".into()),
            ..RowFilter::default()
        };
        assert!(row.matches(&by_text));

        let by_member = RowFilter {
            assignee: Some("u-7".into()),
            ..RowFilter::default()
        };
        assert!(row.matches(&by_member));

        let wrong_status = RowFilter {
            status: Some("Complete".into()),
            ..RowFilter::default()
        };
        assert!(!row.matches(&wrong_status));
    }

    #[test]
    fn newest_first_orders_by_creation_time() {
        let old = task("old", "QA");
        let mut new = task("new", "QA");
        new.created_at = old.created_at + Duration::hours(1);
        let mut rows = vec![&old, &new];
        newest_first(&mut rows);
        assert_eq!(rows[0].id.as_str(), "new");
    }
}
