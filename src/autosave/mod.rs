//! Debounced and immediate cell persistence.
//!
//! Keystrokes go through [`AutosavePipeline::schedule_save`], which keeps at
//! most one armed timer per cell; discrete selections and explicit commits use
//! [`AutosavePipeline::force_save`]. Writes for different cells are independent.
//! A failed write keeps the optimistic value and flags the cell; nothing retries.

pub mod types;

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::columns::types::{CellKey, CellValue};
use crate::events::{EventBus, GridEvent};
use crate::store::types::{Ack, RowId, StoreResult, WorkspaceId};
use crate::store::RowStore;
use crate::tasks::types::TaskPatch;
use types::{AutosaveTiming, IndicatorEntry, OptimisticEntry, PendingSave, SaveStatus};

struct PipelineInner {
    rows: Arc<dyn RowStore>,
    workspace: WorkspaceId,
    timing: AutosaveTiming,
    events: EventBus,
    next_generation: AtomicU64,
    pending: Mutex<HashMap<CellKey, PendingSave>>,
    indicators: Mutex<HashMap<CellKey, IndicatorEntry>>,
    optimistic: Mutex<HashMap<CellKey, OptimisticEntry>>,
}

#[derive(Clone)]
pub struct AutosavePipeline {
    inner: Arc<PipelineInner>,
}

impl AutosavePipeline {
    pub fn new(
        rows: Arc<dyn RowStore>,
        workspace: WorkspaceId,
        timing: AutosaveTiming,
        events: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(PipelineInner {
                rows,
                workspace,
                timing,
                events,
                next_generation: AtomicU64::new(1),
                pending: Mutex::new(HashMap::new()),
                indicators: Mutex::new(HashMap::new()),
                optimistic: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Arms (or re-arms) the debounce timer for `cell`. Only the value of the
    /// last call inside the quiet window is written.
    pub fn schedule_save(&self, cell: CellKey, value: CellValue) {
        let generation = self.inner.next_generation();
        let inner = Arc::clone(&self.inner);
        let timer_cell = cell.clone();

        let mut pending = self.inner.pending.lock();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(inner.timing.debounce).await;
            let due = {
                let mut pending = inner.pending.lock();
                match pending.get(&timer_cell) {
                    Some(entry) if entry.generation == generation => pending.remove(&timer_cell),
                    _ => None,
                }
            };
            if let Some(due) = due {
                let _ = PipelineInner::write(&inner, timer_cell, due.value).await;
            }
        });
        debug!(cell = %cell, "debounced save armed");
        if let Some(previous) = pending.insert(
            cell,
            PendingSave {
                generation,
                value,
                handle,
            },
        ) {
            previous.handle.abort();
        }
    }

    /// Cancels any armed timer for `cell` and writes `value` now.
    pub async fn force_save(&self, cell: CellKey, value: CellValue) -> StoreResult<Ack> {
        self.discard(&cell);
        PipelineInner::write(&self.inner, cell, value).await
    }

    pub async fn flush_all(&self) -> usize {
        let due: Vec<(CellKey, PendingSave)> = self.inner.pending.lock().drain().collect();
        let count = due.len();
        for (cell, entry) in due {
            entry.handle.abort();
            let _ = PipelineInner::write(&self.inner, cell, entry.value).await;
        }
        count
    }

    /// Cancels the armed timer for `cell` without writing.
    pub fn discard(&self, cell: &CellKey) -> bool {
        self.take_pending(cell).is_some()
    }

    /// Cancels every armed timer without writing; returns how many were dropped.
    pub fn cancel_all(&self) -> usize {
        let dropped: Vec<PendingSave> = self
            .inner
            .pending
            .lock()
            .drain()
            .map(|(_, entry)| entry)
            .collect();
        for entry in &dropped {
            entry.handle.abort();
        }
        if !dropped.is_empty() {
            debug!(count = dropped.len(), "dropped pending debounced saves");
        }
        dropped.len()
    }

    fn take_pending(&self, cell: &CellKey) -> Option<PendingSave> {
        let entry = self.inner.pending.lock().remove(cell)?;
        entry.handle.abort();
        Some(entry)
    }

    pub fn has_pending(&self, cell: &CellKey) -> bool {
        self.inner.pending.lock().contains_key(cell)
    }

    pub fn pending_value(&self, cell: &CellKey) -> Option<CellValue> {
        self.inner
            .pending
            .lock()
            .get(cell)
            .map(|entry| entry.value.clone())
    }

    pub fn indicator(&self, cell: &CellKey) -> Option<SaveStatus> {
        self.inner
            .indicators
            .lock()
            .get(cell)
            .map(|entry| entry.status.clone())
    }

    /// Value written (or being written) but not yet confirmed for `cell`.
    pub fn optimistic(&self, cell: &CellKey) -> Option<CellValue> {
        self.inner
            .optimistic
            .lock()
            .get(cell)
            .map(|entry| entry.value.clone())
    }

    /// Forgets indicator and optimistic state for every cell of a row.
    pub fn forget_row(&self, row_id: &RowId) {
        self.inner
            .indicators
            .lock()
            .retain(|cell, _| &cell.row_id != row_id);
        self.inner
            .optimistic
            .lock()
            .retain(|cell, _| &cell.row_id != row_id);
    }
}

impl PipelineInner {
    fn next_generation(&self) -> u64 {
        self.next_generation.fetch_add(1, Ordering::Relaxed)
    }

    fn set_indicator(&self, cell: &CellKey, generation: u64, status: SaveStatus) {
        self.indicators.lock().insert(
            cell.clone(),
            IndicatorEntry {
                generation,
                status: status.clone(),
            },
        );
        self.events.publish(GridEvent::IndicatorChanged {
            cell: cell.clone(),
            status: Some(status),
        });
    }

    /// Applies a completion only if no newer write for the cell has started.
    fn settle_indicator(&self, cell: &CellKey, generation: u64, status: SaveStatus) -> bool {
        let current = self
            .indicators
            .lock()
            .get(cell)
            .map(|entry| entry.generation);
        if current != Some(generation) {
            return false;
        }
        self.set_indicator(cell, generation, status);
        true
    }

    async fn write(inner: &Arc<Self>, cell: CellKey, value: CellValue) -> StoreResult<Ack> {
        let generation = inner.next_generation();
        inner.optimistic.lock().insert(
            cell.clone(),
            OptimisticEntry {
                generation,
                value: value.clone(),
            },
        );
        inner.set_indicator(&cell, generation, SaveStatus::Saving);
        debug!(cell = %cell, generation, "writing cell");

        let patch = TaskPatch::single(cell.column, value);
        let result = inner
            .rows
            .update_row(&inner.workspace, &cell.row_id, patch)
            .await;

        match &result {
            Ok(_) => {
                {
                    let mut optimistic = inner.optimistic.lock();
                    if optimistic
                        .get(&cell)
                        .is_some_and(|entry| entry.generation == generation)
                    {
                        optimistic.remove(&cell);
                    }
                }
                if inner.settle_indicator(&cell, generation, SaveStatus::Saved) {
                    Self::clear_saved_later(inner, cell, generation);
                }
            }
            Err(error) => {
                warn!(cell = %cell, %error, "cell write failed");
                inner.settle_indicator(&cell, generation, SaveStatus::Error(error.to_string()));
            }
        }
        result
    }

    fn clear_saved_later(inner: &Arc<Self>, cell: CellKey, generation: u64) {
        let inner = Arc::clone(inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.timing.saved_linger).await;
            let cleared = {
                let mut indicators = inner.indicators.lock();
                let still_saved = indicators.get(&cell).is_some_and(|entry| {
                    entry.generation == generation && entry.status == SaveStatus::Saved
                });
                if still_saved {
                    indicators.remove(&cell);
                }
                still_saved
            };
            if cleared {
                inner.events.publish(GridEvent::IndicatorChanged { cell, status: None });
            }
        });
    }
}
