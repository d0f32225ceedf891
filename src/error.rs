use thiserror::Error;

use crate::columns::types::ColumnKey;
use crate::options::types::ListName;
use crate::store::types::StoreError;

/// Input rejected before anything is persisted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{list} entry must not be blank")]
    BlankOption { list: ListName },
    #[error("{list} already contains \"{value}\"")]
    DuplicateOption { list: ListName, value: String },
    #[error("\"{value}\" is not an option in {list}")]
    NotAnOption { list: ListName, value: String },
    #[error("{list} has no entry at index {index}")]
    OptionIndexOutOfRange { list: ListName, index: usize },
    #[error("member id and label must not be blank")]
    BlankMember,
    #[error("member \"{0}\" already exists")]
    DuplicateMember(String),
    #[error("\"{0}\" is not a contact address")]
    InvalidContact(String),
    #[error("{0} is required")]
    Required(ColumnKey),
    #[error("value does not fit column {0}")]
    TypeMismatch(ColumnKey),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Task not found: {0}")]
    TaskNotFound(String),
    #[error("Member not found: {0}")]
    MemberNotFound(String),
    #[error("Column {0} is not editable")]
    NotEditable(ColumnKey),
    #[error("No cell is being edited")]
    NotEditing,
    #[error("No sub-flow is open")]
    NoSubflow,
    #[error("Removing \"{0}\" requires confirmation")]
    ConfirmationRequired(String),
    #[error("No account matches {0}")]
    ContactNotFound(String),
    #[error("Grid is not mounted")]
    NotMounted,
    #[error("Config error: {0}")]
    Config(String),
    #[error("{0}")]
    Usage(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type AppResult<T> = Result<T, AppError>;
