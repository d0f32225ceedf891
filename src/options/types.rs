use std::fmt;

use serde::{Deserialize, Serialize};

/// The four plain-string option lists. Members are kept separately because
/// each entry is an identifier/label pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListName {
    Categories,
    Types,
    Priorities,
    Statuses,
}

impl ListName {
    pub const ALL: [ListName; 4] = [
        ListName::Categories,
        ListName::Types,
        ListName::Priorities,
        ListName::Statuses,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Categories => "categories",
            Self::Types => "types",
            Self::Priorities => "priorities",
            Self::Statuses => "statuses",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

impl fmt::Display for ListName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub label: String,
}

impl Member {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }
}

/// Snapshot of a workspace's option registry.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionLists {
    pub categories: Vec<String>,
    pub types: Vec<String>,
    pub priorities: Vec<String>,
    pub statuses: Vec<String>,
    pub members: Vec<Member>,
}

impl OptionLists {
    pub fn list(&self, name: ListName) -> &[String] {
        match name {
            ListName::Categories => &self.categories,
            ListName::Types => &self.types,
            ListName::Priorities => &self.priorities,
            ListName::Statuses => &self.statuses,
        }
    }

    pub fn list_mut(&mut self, name: ListName) -> &mut Vec<String> {
        match name {
            ListName::Categories => &mut self.categories,
            ListName::Types => &mut self.types,
            ListName::Priorities => &mut self.priorities,
            ListName::Statuses => &mut self.statuses,
        }
    }

    /// The status that marks a row completed: always the last status entry.
    pub fn terminal_status(&self) -> Option<&str> {
        self.statuses.last().map(String::as_str)
    }

    pub fn member(&self, id: &str) -> Option<&Member> {
        self.members.iter().find(|member| member.id == id)
    }
}

/// Whether a destructive removal has been confirmed by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Pending,
    Given,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed(String),
    AlreadyAbsent,
}
