use tokio::sync::broadcast;

use crate::autosave::types::SaveStatus;
use crate::columns::types::CellKey;
use crate::edit::types::CloseReason;
use crate::subflow::types::SubflowRequest;

pub const DEFAULT_EVENT_BUFFER_CAPACITY: usize = 256;

/// Redraw hints published by the grid. Receivers that lag simply miss
/// intermediate events; the grid's getters always hold the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridEvent {
    IndicatorChanged {
        cell: CellKey,
        status: Option<SaveStatus>,
    },
    ValidationFailed {
        cell: Option<CellKey>,
        message: String,
    },
    Toast(String),
    RowsReplaced {
        count: usize,
    },
    OptionsReplaced,
    EditOpened(CellKey),
    EditClosed {
        cell: CellKey,
        reason: CloseReason,
    },
    SubflowOpened(SubflowRequest),
    SubflowClosed {
        completed: bool,
    },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<GridEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "event buffer capacity must be greater than 0");
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GridEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: GridEvent) {
        // No receivers is fine: events are hints, not state.
        let _ = self.sender.send(event);
    }
}
