use serde::Serialize;

use crate::columns::types::CellKey;
use crate::options::types::ListName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "list", rename_all = "camelCase")]
pub enum SubflowKind {
    AddOption(ListName),
    Invite,
}

/// A secondary modal opened from a sentinel choice, bound to the cell it
/// was launched from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubflowRequest {
    pub kind: SubflowKind,
    pub origin: CellKey,
    pub from_edit_session: bool,
}
