use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::columns::types::CellValue;

/// Per-cell saving indicator shown next to the cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "message", rename_all = "camelCase")]
pub enum SaveStatus {
    Saving,
    Saved,
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosaveTiming {
    pub debounce: Duration,
    /// How long the `Saved` indicator stays before it is cleared.
    pub saved_linger: Duration,
}

pub(super) struct PendingSave {
    pub generation: u64,
    pub value: CellValue,
    pub handle: JoinHandle<()>,
}

#[derive(Debug, Clone)]
pub(super) struct IndicatorEntry {
    pub generation: u64,
    pub status: SaveStatus,
}

#[derive(Debug, Clone)]
pub(super) struct OptimisticEntry {
    pub generation: u64,
    pub value: CellValue,
}
