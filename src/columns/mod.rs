pub mod types;

use crate::options::types::ListName;
use types::{Column, ColumnKey, ColumnKind};

/// Column order of the team task table; drives both the header and per-cell behavior.
pub const TASK_COLUMNS: &[Column] = &[
    Column {
        key: ColumnKey::Priority,
        label: "Priority",
        width: 90,
        kind: ColumnKind::Select(ListName::Priorities),
    },
    Column {
        key: ColumnKey::Category,
        label: "Category",
        width: 120,
        kind: ColumnKind::Select(ListName::Categories),
    },
    Column {
        key: ColumnKey::Type,
        label: "Type",
        width: 110,
        kind: ColumnKind::Select(ListName::Types),
    },
    Column {
        key: ColumnKey::Status,
        label: "Status",
        width: 110,
        kind: ColumnKind::Select(ListName::Statuses),
    },
    Column {
        key: ColumnKey::TicketNo,
        label: "Ticket No.",
        width: 100,
        kind: ColumnKind::Text { multiline: false },
    },
    Column {
        key: ColumnKey::Company,
        label: "Company",
        width: 140,
        kind: ColumnKind::Text { multiline: false },
    },
    Column {
        key: ColumnKey::InquiryDetails,
        label: "Inquiry Details",
        width: 260,
        kind: ColumnKind::Text { multiline: true },
    },
    Column {
        key: ColumnKey::Notes,
        label: "Notes",
        width: 220,
        kind: ColumnKind::Text { multiline: true },
    },
    Column {
        key: ColumnKey::CsManager,
        label: "CS Manager",
        width: 130,
        kind: ColumnKind::Member,
    },
    Column {
        key: ColumnKey::QaManager,
        label: "QA Manager",
        width: 130,
        kind: ColumnKind::Member,
    },
    Column {
        key: ColumnKey::Developer,
        label: "Developer",
        width: 130,
        kind: ColumnKind::Member,
    },
    Column {
        key: ColumnKey::StartDate,
        label: "Start",
        width: 110,
        kind: ColumnKind::Date,
    },
    Column {
        key: ColumnKey::EndDate,
        label: "End",
        width: 110,
        kind: ColumnKind::Date,
    },
    Column {
        key: ColumnKey::CreatedAt,
        label: "Created",
        width: 150,
        kind: ColumnKind::ReadOnly,
    },
];

pub fn column(key: ColumnKey) -> &'static Column {
    TASK_COLUMNS
        .iter()
        .find(|column| column.key == key)
        .unwrap_or_else(|| unreachable!("every ColumnKey has a descriptor"))
}

pub fn kind_of(key: ColumnKey) -> ColumnKind {
    column(key).kind
}

pub fn is_editable(key: ColumnKey) -> bool {
    kind_of(key).is_editable()
}

/// Columns whose value may never be committed blank.
pub fn is_required(key: ColumnKey) -> bool {
    matches!(key, ColumnKey::TicketNo)
}

pub fn editable_columns() -> impl Iterator<Item = &'static Column> {
    TASK_COLUMNS.iter().filter(|column| column.kind.is_editable())
}
