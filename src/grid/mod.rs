//! The editable collaborative grid: wires the edit controller, autosave
//! pipeline, option registry, sub-flows and live sync around injected stores.

use std::sync::Arc;

use chrono::NaiveDate;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::autosave::types::{AutosaveTiming, SaveStatus};
use crate::autosave::AutosavePipeline;
use crate::choices::{choices_for, Choice, Selection};
use crate::columns::types::{Assignee, CellKey, CellValue, ColumnKey};
use crate::columns;
use crate::config::{GridConfig, UnmountPolicy};
use crate::edit::types::{CloseReason, EditEffect, EditKey, EditSession};
use crate::edit::{selection_value, sentinel_subflow};
use crate::error::{AppError, AppResult};
use crate::events::{EventBus, GridEvent};
use crate::options::types::{ListName, Member, OptionLists};
use crate::options::OptionManager;
use crate::state::GridState;
use crate::store::types::{RowId, WorkspaceId};
use crate::store::{IdentityLookup, OptionStore, RowStore};
use crate::subflow::types::{SubflowKind, SubflowRequest};
use crate::subflow;
use crate::sync::{spawn_sync, SnapshotSink, SyncHandle};
use crate::tasks::types::{RowFilter, Task, TaskDraft};
use crate::tasks::{self, validate_cell, validate_draft};

/// Backend collaborators the grid is constructed with.
#[derive(Clone)]
pub struct GridServices {
    pub rows: Arc<dyn RowStore>,
    pub options: Arc<dyn OptionStore>,
    pub identity: Arc<dyn IdentityLookup>,
}

impl GridServices {
    /// Uses one backend for every contract.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: RowStore + OptionStore + IdentityLookup + 'static,
    {
        Self {
            rows: backend.clone(),
            options: backend.clone(),
            identity: backend,
        }
    }
}

/// Rows split by the completion partition, each newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RowView {
    pub active: Vec<Task>,
    pub completed: Vec<Task>,
}

struct GridShared {
    workspace: WorkspaceId,
    config: GridConfig,
    rows_store: Arc<dyn RowStore>,
    options_store: Arc<dyn OptionStore>,
    identity: Arc<dyn IdentityLookup>,
    state: GridState,
    options: OptionManager,
    autosave: AutosavePipeline,
    events: EventBus,
}

impl SnapshotSink for GridShared {
    fn apply_rows(&self, rows: Vec<Task>) {
        let effects = self.state.edit.lock().reconcile(&rows);
        let orphaned_subflow = {
            let mut subflow = self.state.subflow.lock();
            let vanished = subflow
                .as_ref()
                .is_some_and(|request| !rows.iter().any(|task| task.id == request.origin.row_id));
            if vanished {
                subflow.take()
            } else {
                None
            }
        };
        let count = rows.len();
        *self.state.rows.lock() = rows;

        for effect in effects {
            match effect {
                EditEffect::DiscardPending(cell) => {
                    self.autosave.discard(&cell);
                }
                EditEffect::Closed { cell, reason } => {
                    warn!(cell = %cell, "row deleted while its cell was being edited");
                    self.events.publish(GridEvent::Toast(format!(
                        "Row {} was deleted by someone else; your edit was discarded",
                        cell.row_id
                    )));
                    self.events.publish(GridEvent::EditClosed { cell, reason });
                }
                other => debug!(?other, "ignoring effect during snapshot reconcile"),
            }
        }
        if let Some(request) = orphaned_subflow {
            debug!(origin = %request.origin, "closing sub-flow for deleted row");
            self.events.publish(GridEvent::SubflowClosed { completed: false });
        }
        self.events.publish(GridEvent::RowsReplaced { count });
    }

    fn apply_options(&self, options: OptionLists) {
        self.options.replace(options);
        self.events.publish(GridEvent::OptionsReplaced);
    }
}

impl GridShared {
    async fn run_effects(&self, effects: Vec<EditEffect>) -> AppResult<()> {
        let mut outcome = Ok(());
        for effect in effects {
            match effect {
                EditEffect::ScheduleSave { cell, value } => match validate_cell(cell.column, &value) {
                    Ok(()) => self.autosave.schedule_save(cell, value),
                    Err(error) => {
                        self.autosave.discard(&cell);
                        self.publish_validation(Some(cell), &error);
                    }
                },
                EditEffect::ForceSave { cell, value } => {
                    if self.already_persisted(&cell, &value) {
                        debug!(cell = %cell, "value already stored; skipping write");
                        continue;
                    }
                    if let Err(error) = validate_cell(cell.column, &value) {
                        self.publish_validation(Some(cell), &error);
                        outcome = Err(error.into());
                        continue;
                    }
                    if let Err(error) = self.autosave.force_save(cell, value).await {
                        outcome = Err(error.into());
                    }
                }
                EditEffect::DiscardPending(cell) => {
                    self.autosave.discard(&cell);
                }
                EditEffect::OpenSubflow(request) => {
                    info!(origin = %request.origin, kind = ?request.kind, "sub-flow opened");
                    *self.state.subflow.lock() = Some(request.clone());
                    self.events.publish(GridEvent::SubflowOpened(request));
                }
                EditEffect::Closed { cell, reason } => {
                    self.events.publish(GridEvent::EditClosed { cell, reason });
                }
            }
        }
        outcome
    }

    /// The store already holds `value` and no newer write is armed or unconfirmed.
    fn already_persisted(&self, cell: &CellKey, value: &CellValue) -> bool {
        !self.autosave.has_pending(cell)
            && self.autosave.optimistic(cell).is_none()
            && self
                .state
                .row(&cell.row_id)
                .is_some_and(|row| &row.value(cell.column) == value)
    }

    fn publish_validation(&self, cell: Option<CellKey>, error: &crate::error::ValidationError) {
        debug!(%error, "validation failed");
        self.events.publish(GridEvent::ValidationFailed {
            cell,
            message: error.to_string(),
        });
    }

    fn close_subflow(&self, completed: bool) -> Option<SubflowRequest> {
        let request = self.state.subflow.lock().take();
        if request.is_some() {
            self.events.publish(GridEvent::SubflowClosed { completed });
        }
        request
    }

    /// Commits a plain selection to a cell that has no edit session.
    async fn commit_selection(&self, cell: CellKey, value: &str) -> AppResult<()> {
        let row = self
            .state
            .row(&cell.row_id)
            .ok_or_else(|| AppError::TaskNotFound(cell.row_id.to_string()))?;
        let kind = columns::kind_of(cell.column);
        let current = row.value(cell.column);
        let value = selection_value(cell.column, kind, value, &current, &self.options.snapshot())?;
        if current == value {
            return Ok(());
        }
        self.run_effects(vec![EditEffect::ForceSave { cell, value }]).await
    }

    /// Applies the result of a completed sub-flow through the regular commit path.
    async fn apply_to_origin(&self, request: &SubflowRequest, value: &str) -> AppResult<()> {
        let resumes_session =
            request.from_edit_session && self.state.edit.lock().is_editing(&request.origin);
        if resumes_session {
            let lists = self.options.snapshot();
            let effects = self
                .state
                .edit
                .lock()
                .select(Selection::Value(value.to_owned()), &lists)?;
            self.run_effects(effects).await
        } else {
            self.commit_selection(request.origin.clone(), value).await
        }
    }
}

pub struct EditableGrid {
    shared: Arc<GridShared>,
    sync: Mutex<Option<SyncHandle>>,
}

impl EditableGrid {
    pub fn new(workspace: WorkspaceId, services: GridServices, config: GridConfig) -> Self {
        let events = EventBus::default();
        let timing = AutosaveTiming {
            debounce: config.grid.debounce(),
            saved_linger: config.grid.saved_indicator(),
        };
        let autosave = AutosavePipeline::new(
            services.rows.clone(),
            workspace.clone(),
            timing,
            events.clone(),
        );
        let options = OptionManager::new(services.options.clone(), workspace.clone());
        Self {
            shared: Arc::new(GridShared {
                workspace,
                config,
                rows_store: services.rows,
                options_store: services.options,
                identity: services.identity,
                state: GridState::new(),
                options,
                autosave,
                events,
            }),
            sync: Mutex::new(None),
        }
    }

    pub fn workspace(&self) -> &WorkspaceId {
        &self.shared.workspace
    }

    /// Starts the live subscriptions and seeds default options into empty lists.
    pub async fn mount(&self) -> AppResult<()> {
        if self.is_mounted() {
            return Ok(());
        }
        let shared = &self.shared;
        let rows = shared.rows_store.subscribe_rows(&shared.workspace).await?;
        let options = shared
            .options_store
            .subscribe_options(&shared.workspace)
            .await?;
        let sink: Arc<dyn SnapshotSink> = shared.clone();
        let handle = spawn_sync(sink, rows, options);
        *self.sync.lock() = Some(handle);
        info!(workspace = %shared.workspace, "grid mounted");

        shared.options.seed_defaults(&shared.config.defaults).await
    }

    pub fn is_mounted(&self) -> bool {
        self.sync.lock().is_some()
    }

    /// Stops syncing. Pending debounced text is flushed or dropped per
    /// configuration; returns how many pending saves were affected.
    pub async fn unmount(&self) -> AppResult<usize> {
        let Some(handle) = self.sync.lock().take() else {
            return Err(AppError::NotMounted);
        };
        handle.stop();

        let shared = &self.shared;
        let flush = shared.config.grid.unmount == UnmountPolicy::Flush;
        shared.close_subflow(false);
        let effects = shared.state.edit.lock().unmount(flush);
        let closed_with_write = effects
            .iter()
            .filter(|effect| matches!(effect, EditEffect::ForceSave { .. }))
            .count();
        let effects_result = shared.run_effects(effects).await;
        let affected = if flush {
            shared.autosave.flush_all().await
        } else {
            shared.autosave.cancel_all()
        };
        info!(workspace = %shared.workspace, flush, affected, "grid unmounted");
        effects_result.map(|()| affected + closed_with_write)
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<GridEvent> {
        self.shared.events.subscribe()
    }

    pub fn options(&self) -> &OptionManager {
        &self.shared.options
    }

    pub fn option_lists(&self) -> OptionLists {
        self.shared.options.snapshot()
    }

    pub fn terminal_status(&self) -> Option<String> {
        self.shared.options.terminal_status()
    }

    pub fn rows(&self) -> Vec<Task> {
        self.shared.state.rows.lock().clone()
    }

    pub fn row(&self, row_id: &RowId) -> Option<Task> {
        self.shared.state.row(row_id)
    }

    pub fn set_filter(&self, filter: RowFilter) {
        *self.shared.state.filter.lock() = filter;
    }

    /// Filtered rows split into active and completed, newest first.
    pub fn view(&self) -> RowView {
        let rows = self.rows();
        let filter = self.shared.state.filter.lock().clone();
        let terminal = self.terminal_status();
        let visible: Vec<Task> = rows.into_iter().filter(|task| task.matches(&filter)).collect();
        let (mut active, mut completed) = tasks::partition(&visible, terminal.as_deref());
        tasks::newest_first(&mut active);
        tasks::newest_first(&mut completed);
        RowView {
            active: active.into_iter().cloned().collect(),
            completed: completed.into_iter().cloned().collect(),
        }
    }

    /// What the cell shows right now: the working value while editing, then
    /// an unconfirmed write, then the last snapshot.
    pub fn display_value(&self, row_id: &RowId, column: ColumnKey) -> Option<CellValue> {
        let cell = CellKey::new(row_id.clone(), column);
        if let Some(session) = self.shared.state.edit.lock().session() {
            if session.cell == cell {
                return Some(session.working.clone());
            }
        }
        let value = match self.shared.autosave.optimistic(&cell) {
            Some(value) => value,
            None => self.row(row_id)?.value(column),
        };
        Some(self.relabel(value))
    }

    fn relabel(&self, value: CellValue) -> CellValue {
        match value {
            CellValue::Assignee(Some(Assignee::Member { id, label })) => {
                let label = self
                    .shared
                    .options
                    .snapshot()
                    .member(&id)
                    .map(|member| member.label.clone())
                    .unwrap_or(label);
                CellValue::Assignee(Some(Assignee::Member { id, label }))
            }
            other => other,
        }
    }

    pub fn choices(&self, row_id: &RowId, column: ColumnKey) -> AppResult<Vec<Choice>> {
        let current = self
            .display_value(row_id, column)
            .ok_or_else(|| AppError::TaskNotFound(row_id.to_string()))?;
        Ok(choices_for(
            columns::kind_of(column),
            &current,
            &self.shared.options.snapshot(),
        ))
    }

    pub fn indicator(&self, row_id: &RowId, column: ColumnKey) -> Option<SaveStatus> {
        self.shared
            .autosave
            .indicator(&CellKey::new(row_id.clone(), column))
    }

    pub fn edit_session(&self) -> Option<EditSession> {
        self.shared.state.edit.lock().session().cloned()
    }

    pub fn subflow(&self) -> Option<SubflowRequest> {
        self.shared.state.subflow.lock().clone()
    }

    pub async fn begin_edit(&self, row_id: &RowId, column: ColumnKey) -> AppResult<()> {
        let shared = &self.shared;
        let row = shared
            .state
            .row(row_id)
            .ok_or_else(|| AppError::TaskNotFound(row_id.to_string()))?;
        let effects = shared.state.edit.lock().begin(&row, column)?;
        shared.close_subflow(false);
        let closed_previous = shared.run_effects(effects).await;
        shared
            .events
            .publish(GridEvent::EditOpened(CellKey::new(row_id.clone(), column)));
        closed_previous
    }

    pub async fn input(&self, text: &str) -> AppResult<()> {
        let effects = self.shared.state.edit.lock().input(text)?;
        self.shared.run_effects(effects).await
    }

    pub async fn key(&self, key: EditKey) -> AppResult<()> {
        if matches!(key, EditKey::Enter { shift: false }) {
            self.check_working_value()?;
        }
        let effects = self.shared.state.edit.lock().key(key);
        self.shared.run_effects(effects).await
    }

    pub async fn blur(&self) -> AppResult<()> {
        self.check_working_value()?;
        let effects = self.shared.state.edit.lock().blur();
        self.shared.run_effects(effects).await
    }

    /// Keeps the session open when its typed value cannot be persisted.
    fn check_working_value(&self) -> AppResult<()> {
        let Some(session) = self.edit_session() else {
            return Ok(());
        };
        if !session.touched {
            return Ok(());
        }
        validate_cell(session.cell.column, &session.working).map_err(|error| {
            self.shared.publish_validation(Some(session.cell.clone()), &error);
            AppError::from(error)
        })
    }

    pub async fn select(&self, selection: Selection) -> AppResult<()> {
        let lists = self.shared.options.snapshot();
        let effects = self.shared.state.edit.lock().select(selection, &lists)?;
        self.shared.run_effects(effects).await
    }

    pub async fn set_date(&self, date: Option<NaiveDate>) -> AppResult<()> {
        let effects = self.shared.state.edit.lock().set_date(date)?;
        self.shared.run_effects(effects).await
    }

    /// A pick from a select control rendered outside any edit session.
    pub async fn select_cell(
        &self,
        row_id: &RowId,
        column: ColumnKey,
        selection: Selection,
    ) -> AppResult<()> {
        let cell = CellKey::new(row_id.clone(), column);
        if self.shared.state.row(row_id).is_none() {
            return Err(AppError::TaskNotFound(row_id.to_string()));
        }
        let kind = columns::kind_of(column);
        if let Some(kind) = sentinel_subflow(column, kind, &selection)? {
            let request = SubflowRequest {
                kind,
                origin: cell,
                from_edit_session: false,
            };
            return self
                .shared
                .run_effects(vec![EditEffect::OpenSubflow(request)])
                .await;
        }
        match selection {
            Selection::Value(value) => self.shared.commit_selection(cell, &value).await,
            Selection::CreateNewOption | Selection::InviteUser => Ok(()),
        }
    }

    /// Completes an "add new option" sub-flow. On error the modal stays open.
    pub async fn complete_add_option(&self, value: &str) -> AppResult<String> {
        let request = self.subflow().ok_or(AppError::NoSubflow)?;
        let SubflowKind::AddOption(list) = request.kind else {
            return Err(AppError::NoSubflow);
        };
        let stored = subflow::add_option(&self.shared.options, list, value).await?;
        self.shared.close_subflow(true);
        self.shared.apply_to_origin(&request, &stored).await?;
        Ok(stored)
    }

    /// Completes an "invite user" sub-flow. On error the modal stays open.
    pub async fn complete_invite(&self, address: &str) -> AppResult<Member> {
        let request = self.subflow().ok_or(AppError::NoSubflow)?;
        if request.kind != SubflowKind::Invite {
            return Err(AppError::NoSubflow);
        }
        let member = subflow::invite(
            self.shared.identity.as_ref(),
            &self.shared.options,
            address,
        )
        .await?;
        self.shared.close_subflow(true);
        self.shared.apply_to_origin(&request, &member.id).await?;
        Ok(member)
    }

    /// Dismisses the open sub-flow; an originating edit session stays as it was.
    pub fn cancel_subflow(&self) -> AppResult<()> {
        self.shared
            .close_subflow(false)
            .map(|_| ())
            .ok_or(AppError::NoSubflow)
    }

    pub async fn create_task(&self, mut draft: TaskDraft) -> AppResult<RowId> {
        validate_draft(&draft)?;
        let lists = self.shared.options.snapshot();
        if draft.status.trim().is_empty() {
            if let Some(first) = lists.list(ListName::Statuses).first() {
                draft.status = first.clone();
            }
        }
        let row_id = self
            .shared
            .rows_store
            .create_row(&self.shared.workspace, draft)
            .await?;
        info!(row = %row_id, "task created");
        Ok(row_id)
    }

    pub async fn delete_task(&self, row_id: &RowId) -> AppResult<()> {
        let shared = &self.shared;
        let effects = shared.state.edit.lock().abandon_row(row_id);
        let effects: Vec<EditEffect> = effects
            .into_iter()
            .map(|effect| match effect {
                EditEffect::Closed { cell, .. } => EditEffect::Closed {
                    cell,
                    reason: CloseReason::Cancelled,
                },
                other => other,
            })
            .collect();
        shared.run_effects(effects).await?;
        shared
            .rows_store
            .delete_row(&shared.workspace, row_id)
            .await?;
        shared.autosave.forget_row(row_id);
        info!(row = %row_id, "task deleted");
        Ok(())
    }
}

impl Drop for EditableGrid {
    fn drop(&mut self) {
        if let Some(handle) = self.sync.get_mut().take() {
            handle.stop();
            let dropped = self.shared.autosave.cancel_all();
            if dropped > 0 {
                warn!(dropped, "grid dropped without unmount; pending saves discarded");
            }
        }
    }
}
