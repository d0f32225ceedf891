//! Contracts the grid consumes from its backend. Implementations are injected
//! into [`crate::grid::EditableGrid`] at construction.

pub mod memory;
pub mod types;

use tokio::sync::watch;

use crate::options::types::{ListName, Member, OptionLists};
use crate::tasks::types::{Task, TaskDraft, TaskPatch};
use types::{Ack, RowId, StoreResult, WorkspaceId};

/// Row collection of a workspace. Subscribers always see whole snapshots.
#[async_trait::async_trait]
pub trait RowStore: Send + Sync {
    async fn subscribe_rows(&self, workspace: &WorkspaceId) -> StoreResult<watch::Receiver<Vec<Task>>>;
    async fn create_row(&self, workspace: &WorkspaceId, fields: TaskDraft) -> StoreResult<RowId>;
    async fn update_row(
        &self,
        workspace: &WorkspaceId,
        row_id: &RowId,
        patch: TaskPatch,
    ) -> StoreResult<Ack>;
    async fn delete_row(&self, workspace: &WorkspaceId, row_id: &RowId) -> StoreResult<Ack>;
}

/// Option registry document of a workspace.
#[async_trait::async_trait]
pub trait OptionStore: Send + Sync {
    async fn subscribe_options(
        &self,
        workspace: &WorkspaceId,
    ) -> StoreResult<watch::Receiver<OptionLists>>;
    async fn set_list(
        &self,
        workspace: &WorkspaceId,
        list: ListName,
        values: Vec<String>,
    ) -> StoreResult<Ack>;
    async fn set_members(&self, workspace: &WorkspaceId, members: Vec<Member>) -> StoreResult<Ack>;
    /// Deletes role/permission records keyed by a member identifier.
    async fn delete_member_roles(&self, workspace: &WorkspaceId, member_id: &str) -> StoreResult<Ack>;
}

#[async_trait::async_trait]
pub trait IdentityLookup: Send + Sync {
    /// `Ok(None)` when no account is registered under `address`.
    async fn find_by_contact(&self, address: &str) -> StoreResult<Option<Member>>;
}
