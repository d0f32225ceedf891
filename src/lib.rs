pub mod autosave;
pub mod choices;
pub mod commands;
pub mod columns;
pub mod config;
pub mod edit;
pub mod error;
pub mod events;
pub mod grid;
pub mod options;
pub mod state;
pub mod store;
pub mod subflow;
pub mod sync;
pub mod tasks;

pub use config::GridConfig;
pub use error::{AppError, AppResult, ValidationError};
pub use events::GridEvent;
pub use grid::{EditableGrid, GridServices, RowView};

use tracing_subscriber::EnvFilter;

/// Installs the stderr subscriber. `RUST_LOG` wins over `default_filter`.
pub fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
