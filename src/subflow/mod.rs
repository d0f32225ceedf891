pub mod types;

use tracing::info;

use crate::error::{AppError, AppResult, ValidationError};
use crate::options::types::{ListName, Member};
use crate::options::OptionManager;
use crate::store::IdentityLookup;

/// Registry side of the "add new option" modal; returns the stored value.
pub async fn add_option(options: &OptionManager, list: ListName, value: &str) -> AppResult<String> {
    options.add_option(list, value).await
}

/// Registry side of the "invite user" modal: resolves the address to an
/// account and makes sure it is a workspace member.
pub async fn invite(
    identity: &dyn IdentityLookup,
    options: &OptionManager,
    address: &str,
) -> AppResult<Member> {
    let address = address.trim();
    let looks_like_address = address
        .split_once('@')
        .is_some_and(|(user, domain)| !user.is_empty() && domain.contains('.'));
    if !looks_like_address {
        return Err(ValidationError::InvalidContact(address.to_owned()).into());
    }

    let member = identity
        .find_by_contact(address)
        .await?
        .ok_or_else(|| AppError::ContactNotFound(address.to_owned()))?;

    if let Some(existing) = options.snapshot().member(&member.id).cloned() {
        info!(member = %existing.id, "invited account is already a member");
        return Ok(existing);
    }
    let added = options.add_member(member).await?;
    info!(member = %added.id, "invited account added to members");
    Ok(added)
}
