use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::options::types::ListName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColumnKey {
    Priority,
    Category,
    Type,
    Status,
    TicketNo,
    Company,
    InquiryDetails,
    Notes,
    CsManager,
    QaManager,
    Developer,
    StartDate,
    EndDate,
    CreatedAt,
}

impl ColumnKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Priority => "priority",
            Self::Category => "category",
            Self::Type => "type",
            Self::Status => "status",
            Self::TicketNo => "ticketNo",
            Self::Company => "company",
            Self::InquiryDetails => "inquiryDetails",
            Self::Notes => "notes",
            Self::CsManager => "csManager",
            Self::QaManager => "qaManager",
            Self::Developer => "developer",
            Self::StartDate => "startDate",
            Self::EndDate => "endDate",
            Self::CreatedAt => "createdAt",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        super::TASK_COLUMNS
            .iter()
            .map(|column| column.key)
            .find(|key| key.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a column's cells are edited and persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Select(ListName),
    Member,
    Date,
    Text { multiline: bool },
    ReadOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitPolicy {
    Immediate,
    Debounced,
}

impl ColumnKind {
    pub fn is_editable(self) -> bool {
        !matches!(self, Self::ReadOnly)
    }

    pub fn commit_policy(self) -> CommitPolicy {
        match self {
            Self::Text { .. } => CommitPolicy::Debounced,
            Self::Select(_) | Self::Member | Self::Date | Self::ReadOnly => CommitPolicy::Immediate,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub key: ColumnKey,
    pub label: &'static str,
    pub width: u16,
    pub kind: ColumnKind,
}

/// A person assigned to a role column: either a registry member or a free-text name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Assignee {
    Member { id: String, label: String },
    External { name: String },
}

impl Assignee {
    pub fn display(&self) -> &str {
        match self {
            Self::Member { label, .. } => label,
            Self::External { name } => name,
        }
    }

    pub fn member_id(&self) -> Option<&str> {
        match self {
            Self::Member { id, .. } => Some(id),
            Self::External { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum CellValue {
    Text(String),
    Date(Option<NaiveDate>),
    Assignee(Option<Assignee>),
}

impl CellValue {
    pub fn empty_for(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Date => Self::Date(None),
            ColumnKind::Member => Self::Assignee(None),
            ColumnKind::Select(_) | ColumnKind::Text { .. } | ColumnKind::ReadOnly => {
                Self::Text(String::new())
            }
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Date(_) | Self::Assignee(_) => None,
        }
    }

    pub fn display(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Date(Some(date)) => date.format("%Y-%m-%d").to_string(),
            Self::Date(None) => String::new(),
            Self::Assignee(Some(assignee)) => assignee.display().to_owned(),
            Self::Assignee(None) => String::new(),
        }
    }
}

/// Identifies a single cell: one row, one column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub row_id: crate::store::types::RowId,
    pub column: ColumnKey,
}

impl CellKey {
    pub fn new(row_id: crate::store::types::RowId, column: ColumnKey) -> Self {
        Self { row_id, column }
    }
}

impl fmt::Display for CellKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.row_id, self.column)
    }
}
