use parking_lot::Mutex;

use crate::edit::EditController;
use crate::store::types::RowId;
use crate::subflow::types::SubflowRequest;
use crate::tasks::types::{RowFilter, Task};

/// Client-local grid state. Rows are the last snapshot received from the
/// store; everything else never leaves this client.
pub struct GridState {
    pub rows: Mutex<Vec<Task>>,
    pub edit: Mutex<EditController>,
    pub subflow: Mutex<Option<SubflowRequest>>,
    pub filter: Mutex<RowFilter>,
}

impl GridState {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            edit: Mutex::new(EditController::default()),
            subflow: Mutex::new(None),
            filter: Mutex::new(RowFilter::default()),
        }
    }

    pub fn row(&self, row_id: &RowId) -> Option<Task> {
        self.rows
            .lock()
            .iter()
            .find(|task| &task.id == row_id)
            .cloned()
    }
}

impl Default for GridState {
    fn default() -> Self {
        Self::new()
    }
}
