use crate::columns::types::{CellKey, CellValue, ColumnKind};
use crate::subflow::types::SubflowRequest;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub cell: CellKey,
    pub kind: ColumnKind,
    pub working: CellValue,
    pub original: CellValue,
    /// Set once any keystroke reached a free-text session.
    pub touched: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EditState {
    #[default]
    Idle,
    Editing(EditSession),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditKey {
    Enter { shift: bool },
    Escape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    Committed,
    Unchanged,
    Cancelled,
    /// Another cell was opened.
    Superseded,
    /// The row disappeared from the live snapshot.
    Orphaned,
    Unmounted,
}

/// Work the controller asks its owner to perform after a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditEffect {
    ScheduleSave { cell: CellKey, value: CellValue },
    ForceSave { cell: CellKey, value: CellValue },
    /// Cancel the debounce timer for the cell without writing.
    DiscardPending(CellKey),
    OpenSubflow(SubflowRequest),
    Closed { cell: CellKey, reason: CloseReason },
}
