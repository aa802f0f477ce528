//! Permission resolution.
//!
//! Every authorization decision in the facade funnels through this
//! module: the caller's effective role on a chest is the owner check
//! first, then the unique permission row.

use coffer_core::{Chest, ChestId, UserId};
use coffer_perms::Role;
use coffer_store::{Store, StoreError};

/// Resolve a user's effective role on a chest.
///
/// `None` means no access (or no such chest); storage failures are the
/// only errors.
pub async fn resolve<S: Store>(
    store: &S,
    chest_id: &ChestId,
    user_id: &UserId,
) -> Result<Option<Role>, StoreError> {
    let Some(chest) = store.get_chest(chest_id).await? else {
        return Ok(None);
    };
    role_on(store, &chest, user_id).await
}

/// Resolve against an already-loaded chest.
///
/// The owner short-circuits the permission lookup, so a stray permission
/// row can never downgrade the owner.
pub async fn role_on<S: Store>(
    store: &S,
    chest: &Chest,
    user_id: &UserId,
) -> Result<Option<Role>, StoreError> {
    if chest.owner_id == *user_id {
        return Ok(Some(Role::Owner));
    }
    let permission = store.get_permission(&chest.id, user_id).await?;
    Ok(permission.map(|p| p.role))
}
