pub mod types;

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::config::OptionDefaults;
use crate::error::{AppError, AppResult, ValidationError};
use crate::store::types::WorkspaceId;
use crate::store::OptionStore;
use types::{Confirmation, ListName, Member, OptionLists, RemoveOutcome};

/// New list after adding `value`. Statuses insert before the terminal entry.
pub fn plan_add(lists: &OptionLists, name: ListName, value: &str) -> Result<Vec<String>, ValidationError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::BlankOption { list: name });
    }
    let current = lists.list(name);
    if current.iter().any(|existing| existing == value) {
        return Err(ValidationError::DuplicateOption {
            list: name,
            value: value.to_owned(),
        });
    }

    let mut next = current.to_vec();
    match name {
        ListName::Statuses if !next.is_empty() => next.insert(next.len() - 1, value.to_owned()),
        _ => next.push(value.to_owned()),
    }
    Ok(next)
}

/// New list after renaming the entry at `index`, or `None` when nothing changes.
pub fn plan_rename(
    lists: &OptionLists,
    name: ListName,
    index: usize,
    new_value: &str,
) -> Result<Option<Vec<String>>, ValidationError> {
    let new_value = new_value.trim();
    if new_value.is_empty() {
        return Err(ValidationError::BlankOption { list: name });
    }
    let current = lists.list(name);
    let Some(existing) = current.get(index) else {
        return Err(ValidationError::OptionIndexOutOfRange { list: name, index });
    };
    if existing == new_value {
        return Ok(None);
    }
    if current
        .iter()
        .enumerate()
        .any(|(other, value)| other != index && value == new_value)
    {
        return Err(ValidationError::DuplicateOption {
            list: name,
            value: new_value.to_owned(),
        });
    }

    let mut next = current.to_vec();
    next[index] = new_value.to_owned();
    Ok(Some(next))
}

/// New list after removing `value`, or `None` when it is already gone.
pub fn plan_remove(
    lists: &OptionLists,
    name: ListName,
    value: &str,
    confirmation: Confirmation,
) -> AppResult<Option<Vec<String>>> {
    let current = lists.list(name);
    let Some(position) = current.iter().position(|existing| existing == value) else {
        return Ok(None);
    };
    let is_terminal = name == ListName::Statuses && position + 1 == current.len();
    if is_terminal && confirmation != Confirmation::Given {
        return Err(AppError::ConfirmationRequired(value.to_owned()));
    }

    let mut next = current.to_vec();
    next.remove(position);
    Ok(Some(next))
}

pub fn plan_add_member(members: &[Member], member: &Member) -> Result<Vec<Member>, ValidationError> {
    let id = member.id.trim();
    let label = member.label.trim();
    if id.is_empty() || label.is_empty() {
        return Err(ValidationError::BlankMember);
    }
    if members.iter().any(|existing| existing.id == id) {
        return Err(ValidationError::DuplicateMember(id.to_owned()));
    }
    let mut next = members.to_vec();
    next.push(Member::new(id, label));
    Ok(next)
}

#[derive(Clone)]
pub struct OptionManager {
    store: Arc<dyn OptionStore>,
    workspace: WorkspaceId,
    snapshot: Arc<RwLock<OptionLists>>,
}

impl OptionManager {
    pub fn new(store: Arc<dyn OptionStore>, workspace: WorkspaceId) -> Self {
        Self {
            store,
            workspace,
            snapshot: Arc::new(RwLock::new(OptionLists::default())),
        }
    }

    pub fn snapshot(&self) -> OptionLists {
        self.snapshot.read().clone()
    }

    pub fn terminal_status(&self) -> Option<String> {
        self.snapshot.read().terminal_status().map(str::to_owned)
    }

    /// Replaces the local copy wholesale with a snapshot received from the store.
    pub fn replace(&self, lists: OptionLists) {
        *self.snapshot.write() = lists;
    }

    async fn write_list(&self, name: ListName, values: Vec<String>) -> AppResult<()> {
        self.store
            .set_list(&self.workspace, name, values.clone())
            .await?;
        *self.snapshot.write().list_mut(name) = values;
        Ok(())
    }

    async fn write_members(&self, members: Vec<Member>) -> AppResult<()> {
        self.store
            .set_members(&self.workspace, members.clone())
            .await?;
        self.snapshot.write().members = members;
        Ok(())
    }

    /// Adds an option and returns the stored (trimmed) value.
    pub async fn add_option(&self, name: ListName, value: &str) -> AppResult<String> {
        let next = plan_add(&self.snapshot.read(), name, value)?;
        self.write_list(name, next).await?;
        info!(list = %name, value = value.trim(), "option added");
        Ok(value.trim().to_owned())
    }

    pub async fn rename_option(&self, name: ListName, index: usize, new_value: &str) -> AppResult<()> {
        let Some(next) = plan_rename(&self.snapshot.read(), name, index, new_value)? else {
            debug!(list = %name, index, "rename is a no-op");
            return Ok(());
        };
        self.write_list(name, next).await?;
        info!(list = %name, index, value = new_value.trim(), "option renamed");
        Ok(())
    }

    pub async fn remove_option(
        &self,
        name: ListName,
        value: &str,
        confirmation: Confirmation,
    ) -> AppResult<RemoveOutcome> {
        let Some(next) = plan_remove(&self.snapshot.read(), name, value, confirmation)? else {
            debug!(list = %name, value, "option already absent");
            return Ok(RemoveOutcome::AlreadyAbsent);
        };
        self.write_list(name, next).await?;
        info!(list = %name, value, "option removed");
        Ok(RemoveOutcome::Removed(value.to_owned()))
    }

    pub async fn remove_option_at(
        &self,
        name: ListName,
        index: usize,
        confirmation: Confirmation,
    ) -> AppResult<RemoveOutcome> {
        let value = self
            .snapshot
            .read()
            .list(name)
            .get(index)
            .cloned()
            .ok_or(ValidationError::OptionIndexOutOfRange { list: name, index })?;
        self.remove_option(name, &value, confirmation).await
    }

    pub async fn add_member(&self, member: Member) -> AppResult<Member> {
        let next = plan_add_member(&self.snapshot.read().members, &member)?;
        let added = next.last().cloned().unwrap_or(member);
        self.write_members(next).await?;
        info!(member = %added.id, "member added");
        Ok(added)
    }

    pub async fn rename_member_label(&self, id: &str, label: &str) -> AppResult<()> {
        let label = label.trim();
        if label.is_empty() {
            return Err(ValidationError::BlankMember.into());
        }
        let mut next = self.snapshot.read().members.clone();
        let Some(member) = next.iter_mut().find(|member| member.id == id) else {
            return Err(AppError::MemberNotFound(id.to_owned()));
        };
        if member.label == label {
            return Ok(());
        }
        member.label = label.to_owned();
        self.write_members(next).await?;
        info!(member = id, "member relabelled");
        Ok(())
    }

    /// Removes a member by identifier and deletes the role records keyed by it.
    /// Roles go first, so a failed call leaves the member listed and a retry
    /// finishes the cascade.
    pub async fn remove_member(&self, id: &str) -> AppResult<RemoveOutcome> {
        let current = self.snapshot.read().members.clone();
        if !current.iter().any(|member| member.id == id) {
            return Ok(RemoveOutcome::AlreadyAbsent);
        }
        self.store.delete_member_roles(&self.workspace, id).await?;
        let next = current.into_iter().filter(|member| member.id != id).collect();
        self.write_members(next).await?;
        info!(member = id, "member removed");
        Ok(RemoveOutcome::Removed(id.to_owned()))
    }

    /// Writes configured defaults into lists that are still empty.
    pub async fn seed_defaults(&self, defaults: &OptionDefaults) -> AppResult<()> {
        for name in ListName::ALL {
            let wanted = defaults.list(name);
            if wanted.is_empty() || !self.snapshot.read().list(name).is_empty() {
                continue;
            }
            self.write_list(name, wanted.to_vec()).await?;
            info!(list = %name, count = wanted.len(), "seeded default options");
        }
        Ok(())
    }
}
