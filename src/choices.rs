//! Option lists as rendered inside a select-type cell.

use serde::Serialize;

use crate::columns::types::{Assignee, CellValue, ColumnKind};
use crate::options::types::{Member, OptionLists};

pub const CREATE_OPTION_LABEL: &str = "+ Add new option…";
pub const INVITE_USER_LABEL: &str = "+ Invite user…";
pub const REMOVED_SUFFIX: &str = " (removed)";

/// What the user picked in a select control. Sentinels launch a sub-flow and
/// are never persisted as a cell value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "camelCase")]
pub enum Selection {
    /// A list entry; for member columns this is the member identifier.
    Value(String),
    CreateNewOption,
    InviteUser,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub selection: Selection,
    pub label: String,
    pub enabled: bool,
}

impl Choice {
    fn live(value: String, label: String) -> Self {
        Self {
            selection: Selection::Value(value),
            label,
            enabled: true,
        }
    }

    fn stale(value: String, label: &str) -> Self {
        Self {
            selection: Selection::Value(value),
            label: format!("{label}{REMOVED_SUFFIX}"),
            enabled: false,
        }
    }
}

/// Choices for a select or member cell holding `current`: live entries, a
/// disabled placeholder when `current` is no longer listed, then the sentinel.
/// Returns an empty list for columns that are not select-type.
pub fn choices_for(kind: ColumnKind, current: &CellValue, lists: &OptionLists) -> Vec<Choice> {
    match kind {
        ColumnKind::Select(name) => {
            let live = lists.list(name);
            let mut choices: Vec<Choice> = live
                .iter()
                .map(|value| Choice::live(value.clone(), value.clone()))
                .collect();
            if let Some(text) = current.as_text().filter(|text| !text.is_empty()) {
                if !live.iter().any(|value| value == text) {
                    choices.push(Choice::stale(text.to_owned(), text));
                }
            }
            choices.push(Choice {
                selection: Selection::CreateNewOption,
                label: CREATE_OPTION_LABEL.to_owned(),
                enabled: true,
            });
            choices
        }
        ColumnKind::Member => {
            let mut choices: Vec<Choice> = lists
                .members
                .iter()
                .map(|Member { id, label }| Choice::live(id.clone(), label.clone()))
                .collect();
            if let CellValue::Assignee(Some(assignee)) = current {
                if let Some(stale) = stale_assignee(assignee, lists) {
                    choices.push(stale);
                }
            }
            choices.push(Choice {
                selection: Selection::InviteUser,
                label: INVITE_USER_LABEL.to_owned(),
                enabled: true,
            });
            choices
        }
        ColumnKind::Date | ColumnKind::Text { .. } | ColumnKind::ReadOnly => Vec::new(),
    }
}

fn stale_assignee(assignee: &Assignee, lists: &OptionLists) -> Option<Choice> {
    match assignee {
        Assignee::Member { id, label } if lists.member(id).is_none() => {
            Some(Choice::stale(id.clone(), label))
        }
        Assignee::Member { .. } => None,
        Assignee::External { name } => Some(Choice {
            selection: Selection::Value(name.clone()),
            label: name.clone(),
            enabled: false,
        }),
    }
}

/// Resolves a picked member-column value: a registered identifier becomes a
/// member reference carrying the current label, anything else an external name.
pub fn resolve_assignee(value: &str, lists: &OptionLists) -> Option<Assignee> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    Some(match lists.member(value) {
        Some(member) => Assignee::Member {
            id: member.id.clone(),
            label: member.label.clone(),
        },
        None => Assignee::External {
            name: value.to_owned(),
        },
    })
}
