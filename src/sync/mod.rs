//! Live sync layer: forwards every remote snapshot to a [`SnapshotSink`] for
//! as long as the handle lives. Snapshots replace local state wholesale.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::options::types::OptionLists;
use crate::tasks::types::Task;

pub trait SnapshotSink: Send + Sync + 'static {
    fn apply_rows(&self, rows: Vec<Task>);
    fn apply_options(&self, options: OptionLists);
}

/// Running subscriptions. Dropping the handle stops them.
#[derive(Debug)]
pub struct SyncHandle {
    tasks: Vec<JoinHandle<()>>,
}

impl SyncHandle {
    pub fn is_running(&self) -> bool {
        self.tasks.iter().any(|task| !task.is_finished())
    }

    pub fn stop(mut self) {
        self.abort_all();
    }

    fn abort_all(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.abort_all();
    }
}

/// Applies the current snapshots immediately, then every change after them.
pub fn spawn_sync(
    sink: Arc<dyn SnapshotSink>,
    mut rows: watch::Receiver<Vec<Task>>,
    mut options: watch::Receiver<OptionLists>,
) -> SyncHandle {
    sink.apply_rows(rows.borrow_and_update().clone());
    sink.apply_options(options.borrow_and_update().clone());

    let row_sink = Arc::clone(&sink);
    let row_task = tokio::spawn(async move {
        while rows.changed().await.is_ok() {
            let snapshot = rows.borrow_and_update().clone();
            debug!(rows = snapshot.len(), "row snapshot received");
            row_sink.apply_rows(snapshot);
        }
        warn!("row subscription closed by the store");
    });

    let option_task = tokio::spawn(async move {
        while options.changed().await.is_ok() {
            let snapshot = options.borrow_and_update().clone();
            debug!("option snapshot received");
            sink.apply_options(snapshot);
        }
        warn!("option subscription closed by the store");
    });

    SyncHandle {
        tasks: vec![row_task, option_task],
    }
}
