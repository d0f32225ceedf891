use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

use super::types::{Ack, RowId, StoreError, StoreResult, WorkspaceId};
use super::{IdentityLookup, OptionStore, RowStore};
use crate::options::types::{ListName, Member, OptionLists};
use crate::tasks::types::{Task, TaskDraft, TaskPatch};

struct WorkspaceDocs {
    rows: watch::Sender<Vec<Task>>,
    options: watch::Sender<OptionLists>,
    roles: HashMap<String, Vec<String>>,
}

impl Default for WorkspaceDocs {
    fn default() -> Self {
        let (rows, _) = watch::channel(Vec::new());
        let (options, _) = watch::channel(OptionLists::default());
        Self {
            rows,
            options,
            roles: HashMap::new(),
        }
    }
}

#[derive(Debug, Default)]
struct FaultPlan {
    failing_writes: usize,
    unavailable: bool,
    update_latencies: VecDeque<Duration>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateCall {
    pub workspace: WorkspaceId,
    pub row_id: RowId,
    pub patch: TaskPatch,
}

/// A write against the option record, in the order it reached the store.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionCall {
    SetList { list: ListName, values: Vec<String> },
    SetMembers(Vec<Member>),
    DeleteMemberRoles(String),
}

/// Process-local backend implementing every store contract. Snapshots are
/// published through `watch` channels, so subscribers see the latest state.
#[derive(Default)]
pub struct InMemoryStore {
    workspaces: Mutex<HashMap<WorkspaceId, WorkspaceDocs>>,
    contacts: Mutex<HashMap<String, Member>>,
    faults: Mutex<FaultPlan>,
    update_calls: Mutex<Vec<UpdateCall>>,
    option_calls: Mutex<Vec<OptionCall>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_workspace<R>(&self, workspace: &WorkspaceId, f: impl FnOnce(&mut WorkspaceDocs) -> R) -> R {
        let mut workspaces = self.workspaces.lock();
        f(workspaces.entry(workspace.clone()).or_default())
    }

    fn check_write(&self) -> StoreResult<()> {
        let mut faults = self.faults.lock();
        if faults.unavailable {
            return Err(StoreError::Unavailable("backend offline".to_owned()));
        }
        if faults.failing_writes > 0 {
            faults.failing_writes -= 1;
            return Err(StoreError::Rejected("injected write failure".to_owned()));
        }
        Ok(())
    }

    pub fn seed_rows(&self, workspace: &WorkspaceId, rows: Vec<Task>) {
        self.with_workspace(workspace, |docs| {
            docs.rows.send_replace(rows);
        });
    }

    pub fn seed_options(&self, workspace: &WorkspaceId, options: OptionLists) {
        self.with_workspace(workspace, |docs| {
            docs.options.send_replace(options);
        });
    }

    pub fn rows(&self, workspace: &WorkspaceId) -> Vec<Task> {
        self.with_workspace(workspace, |docs| docs.rows.borrow().clone())
    }

    pub fn row(&self, workspace: &WorkspaceId, row_id: &RowId) -> Option<Task> {
        self.rows(workspace).into_iter().find(|task| &task.id == row_id)
    }

    pub fn options(&self, workspace: &WorkspaceId) -> OptionLists {
        self.with_workspace(workspace, |docs| docs.options.borrow().clone())
    }

    pub fn register_contact(&self, address: &str, member: Member) {
        self.contacts
            .lock()
            .insert(address.trim().to_lowercase(), member);
    }

    pub fn grant_role(&self, workspace: &WorkspaceId, member_id: &str, role: &str) {
        self.with_workspace(workspace, |docs| {
            docs.roles
                .entry(member_id.to_owned())
                .or_default()
                .push(role.to_owned());
        });
    }

    pub fn roles(&self, workspace: &WorkspaceId, member_id: &str) -> Vec<String> {
        self.with_workspace(workspace, |docs| {
            docs.roles.get(member_id).cloned().unwrap_or_default()
        })
    }

    /// Every `update_row` call in arrival order, including ones that failed.
    pub fn update_calls(&self) -> Vec<UpdateCall> {
        self.update_calls.lock().clone()
    }

    /// Every option-record write in arrival order, including ones that failed.
    pub fn option_calls(&self) -> Vec<OptionCall> {
        self.option_calls.lock().clone()
    }

    pub fn fail_next_writes(&self, count: usize) {
        self.faults.lock().failing_writes = count;
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.faults.lock().unavailable = unavailable;
    }

    /// Delays the next `update_row` call by `latency` before it is applied.
    pub fn push_update_latency(&self, latency: Duration) {
        self.faults.lock().update_latencies.push_back(latency);
    }
}

#[async_trait::async_trait]
impl RowStore for InMemoryStore {
    async fn subscribe_rows(&self, workspace: &WorkspaceId) -> StoreResult<watch::Receiver<Vec<Task>>> {
        if self.faults.lock().unavailable {
            return Err(StoreError::Unavailable("backend offline".to_owned()));
        }
        Ok(self.with_workspace(workspace, |docs| docs.rows.subscribe()))
    }

    async fn create_row(&self, workspace: &WorkspaceId, fields: TaskDraft) -> StoreResult<RowId> {
        self.check_write()?;
        let id = RowId::from(Uuid::new_v4().to_string());
        let task = fields.into_task(id.clone(), Utc::now());
        self.with_workspace(workspace, |docs| {
            docs.rows.send_modify(|rows| rows.push(task));
        });
        debug!(workspace = %workspace, row = %id, "row created");
        Ok(id)
    }

    async fn update_row(
        &self,
        workspace: &WorkspaceId,
        row_id: &RowId,
        patch: TaskPatch,
    ) -> StoreResult<Ack> {
        self.update_calls.lock().push(UpdateCall {
            workspace: workspace.clone(),
            row_id: row_id.clone(),
            patch: patch.clone(),
        });
        let latency = self.faults.lock().update_latencies.pop_front();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.check_write()?;

        self.with_workspace(workspace, |docs| -> StoreResult<Ack> {
            let mut rows = docs.rows.borrow().clone();
            let task = rows
                .iter_mut()
                .find(|task| &task.id == row_id)
                .ok_or_else(|| StoreError::NotFound(row_id.to_string()))?;
            task.apply(&patch)
                .map_err(|error| StoreError::Rejected(error.to_string()))?;
            docs.rows.send_replace(rows);
            Ok(Ack)
        })
    }

    async fn delete_row(&self, workspace: &WorkspaceId, row_id: &RowId) -> StoreResult<Ack> {
        self.check_write()?;
        self.with_workspace(workspace, |docs| {
            docs.rows.send_modify(|rows| rows.retain(|task| &task.id != row_id));
        });
        Ok(Ack)
    }
}

#[async_trait::async_trait]
impl OptionStore for InMemoryStore {
    async fn subscribe_options(
        &self,
        workspace: &WorkspaceId,
    ) -> StoreResult<watch::Receiver<OptionLists>> {
        if self.faults.lock().unavailable {
            return Err(StoreError::Unavailable("backend offline".to_owned()));
        }
        Ok(self.with_workspace(workspace, |docs| docs.options.subscribe()))
    }

    async fn set_list(
        &self,
        workspace: &WorkspaceId,
        list: ListName,
        values: Vec<String>,
    ) -> StoreResult<Ack> {
        self.option_calls.lock().push(OptionCall::SetList {
            list,
            values: values.clone(),
        });
        self.check_write()?;
        self.with_workspace(workspace, |docs| {
            docs.options.send_modify(|options| *options.list_mut(list) = values);
        });
        Ok(Ack)
    }

    async fn set_members(&self, workspace: &WorkspaceId, members: Vec<Member>) -> StoreResult<Ack> {
        self.option_calls
            .lock()
            .push(OptionCall::SetMembers(members.clone()));
        self.check_write()?;
        self.with_workspace(workspace, |docs| {
            docs.options.send_modify(|options| options.members = members);
        });
        Ok(Ack)
    }

    async fn delete_member_roles(&self, workspace: &WorkspaceId, member_id: &str) -> StoreResult<Ack> {
        self.option_calls
            .lock()
            .push(OptionCall::DeleteMemberRoles(member_id.to_owned()));
        self.check_write()?;
        self.with_workspace(workspace, |docs| {
            docs.roles.remove(member_id);
        });
        Ok(Ack)
    }
}

#[async_trait::async_trait]
impl IdentityLookup for InMemoryStore {
    async fn find_by_contact(&self, address: &str) -> StoreResult<Option<Member>> {
        Ok(self
            .contacts
            .lock()
            .get(&address.trim().to_lowercase())
            .cloned())
    }
}
