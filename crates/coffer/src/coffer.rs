//! The Coffer: unified API for shared chests.
//!
//! The Coffer brings together storage, permission resolution, invites,
//! and the external user directory into a cohesive interface for
//! building applications.

use std::sync::Arc;

use coffer_core::{Chest, ChestId, Email, InviteId, Item, ItemDraft, ItemId, UserId};
use coffer_perms::{ensure_grantable, require, require_owner, Invite, InviteToken, Permission, Role};
use coffer_store::{
    Cascade, ChestUpdate, ConsumeOutcome, InviteInsert, Store, UserDirectory, UserProfile,
};

use crate::caller::Caller;
use crate::error::{CofferError, Result};
use crate::resolver;

/// Attempts to mint a non-colliding invite token before giving up.
/// Collisions on 128 random bits mean the RNG is broken.
const TOKEN_RETRIES: usize = 3;

/// Configuration for the Coffer.
#[derive(Debug, Clone)]
pub struct CofferConfig {
    /// How long a freshly issued invite stays redeemable, in
    /// milliseconds.
    pub invite_ttl_ms: i64,
}

impl Default for CofferConfig {
    fn default() -> Self {
        Self {
            invite_ttl_ms: coffer_perms::DEFAULT_INVITE_TTL_MS,
        }
    }
}

/// A chest together with the caller's effective role on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChestView {
    pub chest: Chest,
    pub role: Role,
}

/// The caller's chests, split by how they reached them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MyChests {
    /// Chests the caller owns.
    pub owned: Vec<Chest>,
    /// Chests shared with the caller via a permission row.
    pub shared: Vec<Chest>,
}

/// A collaborator's public identity and role on a chest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collaborator {
    pub profile: UserProfile,
    pub role: Role,
    /// When access began: grant time for collaborators, chest creation
    /// for the owner (Unix ms).
    pub since: i64,
}

/// Everyone with access to a chest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollaboratorList {
    /// `None` when the owner's account no longer exists in the
    /// directory.
    pub owner: Option<Collaborator>,
    /// Permission-row holders, grant order. Users missing from the
    /// directory are omitted.
    pub collaborators: Vec<Collaborator>,
}

/// The main Coffer struct.
///
/// Provides a unified API for:
/// - Creating and managing chests
/// - Resolving effective roles
/// - Issuing, revoking, and redeeming invites
/// - Listing and removing collaborators
/// - The item catalog
pub struct Coffer<S: Store, D: UserDirectory> {
    /// The storage backend.
    store: Arc<S>,
    /// The external identity provider.
    directory: Arc<D>,
    /// Configuration.
    config: CofferConfig,
}

impl<S: Store, D: UserDirectory> Coffer<S, D> {
    /// Create a new Coffer instance.
    pub fn new(store: Arc<S>, directory: Arc<D>, config: CofferConfig) -> Self {
        Self {
            store,
            directory,
            config,
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load a chest and gate the caller at `required`.
    ///
    /// Missing chests surface as `ChestNotFound`; an existing chest the
    /// caller cannot act on surfaces as `AccessDenied`.
    async fn authorize(
        &self,
        caller: &Caller,
        chest_id: &ChestId,
        required: Role,
    ) -> Result<(Chest, Role)> {
        let chest = self
            .store
            .get_chest(chest_id)
            .await?
            .ok_or(CofferError::ChestNotFound(*chest_id))?;
        let role = resolver::role_on(self.store.as_ref(), &chest, &caller.user_id).await?;
        let role = require(role, required)?;
        Ok((chest, role))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Chest Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a new chest owned by the caller.
    ///
    /// Ownership is the `owner_id` column; no permission row is written.
    pub async fn create_chest(
        &self,
        caller: &Caller,
        name: &str,
        description: Option<String>,
    ) -> Result<Chest> {
        let chest = Chest::new(caller.user_id, name, description, now_millis());
        self.store.insert_chest(&chest).await?;
        tracing::info!(chest = %chest.id, owner = %caller.user_id, "chest created");
        Ok(chest)
    }

    /// Get a chest together with the caller's role on it.
    pub async fn get_chest(&self, caller: &Caller, chest_id: &ChestId) -> Result<ChestView> {
        let (chest, role) = self.authorize(caller, chest_id, Role::Viewer).await?;
        Ok(ChestView { chest, role })
    }

    /// List the caller's chests, owned and shared.
    pub async fn list_chests(&self, caller: &Caller) -> Result<MyChests> {
        let owned = self.store.list_chests_owned_by(&caller.user_id).await?;
        let shared = self.store.list_chests_shared_with(&caller.user_id).await?;
        Ok(MyChests { owned, shared })
    }

    /// Apply a partial update to a chest. Requires `Admin` or better.
    pub async fn update_chest(
        &self,
        caller: &Caller,
        chest_id: &ChestId,
        update: ChestUpdate,
    ) -> Result<Chest> {
        self.authorize(caller, chest_id, Role::Admin).await?;

        if !update.is_empty() && !self.store.update_chest(chest_id, &update).await? {
            return Err(CofferError::ChestNotFound(*chest_id));
        }
        self.store
            .get_chest(chest_id)
            .await?
            .ok_or(CofferError::ChestNotFound(*chest_id))
    }

    /// Delete a chest and everything scoped to it.
    ///
    /// Owner only; a delegated `Admin` cannot destroy the chest. The
    /// cascade runs as one store transaction.
    pub async fn delete_chest(&self, caller: &Caller, chest_id: &ChestId) -> Result<Cascade> {
        let chest = self
            .store
            .get_chest(chest_id)
            .await?
            .ok_or(CofferError::ChestNotFound(*chest_id))?;
        let role = resolver::role_on(self.store.as_ref(), &chest, &caller.user_id).await?;
        require_owner(role)?;

        let cascade = self
            .store
            .delete_chest(chest_id)
            .await?
            .ok_or(CofferError::ChestNotFound(*chest_id))?;
        tracing::info!(
            chest = %chest_id,
            permissions = cascade.permissions,
            invites = cascade.invites,
            items = cascade.items,
            "chest deleted"
        );
        Ok(cascade)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Invites
    // ─────────────────────────────────────────────────────────────────────────

    /// Issue an invite for `email` at `role`. Requires `Admin` or
    /// better; `role` must be grantable.
    ///
    /// At most one outstanding invite per `(chest, email)`; expired
    /// leftovers do not block a fresh one. The store enforces that
    /// uniqueness inside the insert itself, so two racing issuers
    /// cannot both succeed.
    pub async fn invite(
        &self,
        caller: &Caller,
        chest_id: &ChestId,
        email: Email,
        role: Role,
    ) -> Result<Invite> {
        self.authorize(caller, chest_id, Role::Admin).await?;
        ensure_grantable(role)?;

        let now = now_millis();
        let mut invite = Invite::new(
            *chest_id,
            email,
            role,
            caller.user_id,
            now,
            self.config.invite_ttl_ms,
        );
        for _ in 0..TOKEN_RETRIES {
            match self.store.insert_invite(&invite, now).await? {
                InviteInsert::Inserted => {
                    tracing::info!(
                        chest = %chest_id,
                        invite = %invite.id,
                        role = %role,
                        "invite issued"
                    );
                    return Ok(invite);
                }
                InviteInsert::TokenExists => invite.regenerate_token(),
                InviteInsert::DuplicateOutstanding => {
                    return Err(CofferError::DuplicateInvite(invite.email));
                }
                InviteInsert::ChestGone => {
                    return Err(CofferError::ChestNotFound(*chest_id));
                }
            }
        }
        Err(CofferError::Store(coffer_store::StoreError::InvalidData(
            "invite token kept colliding".into(),
        )))
    }

    /// Redeem an invite by token, becoming a collaborator.
    ///
    /// The invite is consumed: redemption and the permission insert are
    /// one store transaction, so of two racing redeemers exactly one
    /// wins.
    pub async fn accept_invite(&self, caller: &Caller, token: &InviteToken) -> Result<Chest> {
        let invite = self
            .store
            .get_invite_by_token(token)
            .await?
            .ok_or(CofferError::InviteNotFound)?;

        let now = now_millis();
        if invite.is_expired(now) {
            return Err(CofferError::InviteExpired {
                expires_at: invite.expires_at,
            });
        }
        if invite.email != caller.email {
            return Err(CofferError::Forbidden);
        }

        let chest = self
            .store
            .get_chest(&invite.chest_id)
            .await?
            .ok_or(CofferError::InviteNotFound)?;
        if chest.owner_id == caller.user_id {
            return Err(CofferError::AlreadyCollaborator(chest.id));
        }

        let grant = Permission::new(invite.chest_id, caller.user_id, invite.role, now);
        match self.store.consume_invite(&invite.id, &grant).await? {
            ConsumeOutcome::Consumed => {
                tracing::info!(
                    chest = %chest.id,
                    user = %caller.user_id,
                    role = %invite.role,
                    "invite redeemed"
                );
                Ok(chest)
            }
            ConsumeOutcome::InviteGone => Err(CofferError::InviteNotFound),
            ConsumeOutcome::PermissionExists => Err(CofferError::AlreadyCollaborator(chest.id)),
        }
    }

    /// Revoke a pending invite. Requires `Admin` or better.
    pub async fn revoke_invite(
        &self,
        caller: &Caller,
        chest_id: &ChestId,
        invite_id: &InviteId,
    ) -> Result<()> {
        self.authorize(caller, chest_id, Role::Admin).await?;

        let invite = self
            .store
            .get_invite(invite_id)
            .await?
            .filter(|invite| invite.chest_id == *chest_id)
            .ok_or(CofferError::InviteNotFound)?;

        if !self.store.delete_invite(&invite.id).await? {
            return Err(CofferError::InviteNotFound);
        }
        tracing::info!(chest = %chest_id, invite = %invite_id, "invite revoked");
        Ok(())
    }

    /// List outstanding invites on a chest. Requires `Admin` or better.
    /// Expired invites are filtered out.
    pub async fn list_invites(&self, caller: &Caller, chest_id: &ChestId) -> Result<Vec<Invite>> {
        self.authorize(caller, chest_id, Role::Admin).await?;

        let now = now_millis();
        let invites = self
            .store
            .list_invites(chest_id)
            .await?
            .into_iter()
            .filter(|invite| !invite.is_expired(now))
            .collect();
        Ok(invites)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Collaborators
    // ─────────────────────────────────────────────────────────────────────────

    /// List everyone with access to a chest. Requires any role.
    ///
    /// Users whose accounts no longer exist in the directory are
    /// silently omitted; for the owner that shows up as `owner: None`.
    pub async fn collaborators(
        &self,
        caller: &Caller,
        chest_id: &ChestId,
    ) -> Result<CollaboratorList> {
        let (chest, _) = self.authorize(caller, chest_id, Role::Viewer).await?;

        let owner = self
            .directory
            .get(&chest.owner_id)
            .await?
            .map(|profile| Collaborator {
                profile,
                role: Role::Owner,
                since: chest.created_at,
            });

        let mut collaborators = Vec::new();
        for permission in self.store.list_permissions(chest_id).await? {
            if let Some(profile) = self.directory.get(&permission.user_id).await? {
                collaborators.push(Collaborator {
                    profile,
                    role: permission.role,
                    since: permission.granted_at,
                });
            }
        }

        Ok(CollaboratorList {
            owner,
            collaborators,
        })
    }

    /// Remove a collaborator's permission row. Requires `Admin` or
    /// better.
    ///
    /// Removing someone without a row is a no-op; the owner has no row,
    /// so "removing" the owner is a no-op by construction.
    pub async fn remove_collaborator(
        &self,
        caller: &Caller,
        chest_id: &ChestId,
        target: &UserId,
    ) -> Result<()> {
        self.authorize(caller, chest_id, Role::Admin).await?;

        if self.store.delete_permission(chest_id, target).await? {
            tracing::info!(chest = %chest_id, user = %target, "collaborator removed");
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Item Catalog
    // ─────────────────────────────────────────────────────────────────────────

    /// Add an item to a chest. Requires `Editor` or better.
    pub async fn add_item(
        &self,
        caller: &Caller,
        chest_id: &ChestId,
        draft: ItemDraft,
    ) -> Result<Item> {
        self.authorize(caller, chest_id, Role::Editor).await?;

        let item = Item::from_draft(*chest_id, caller.user_id, draft, now_millis());
        if !self.store.insert_item(&item).await? {
            return Err(CofferError::ChestNotFound(*chest_id));
        }
        tracing::debug!(chest = %chest_id, item = %item.id, "item added");
        Ok(item)
    }

    /// Get an item. Requires `Viewer` or better on its chest.
    pub async fn get_item(&self, caller: &Caller, item_id: &ItemId) -> Result<Item> {
        let item = self
            .store
            .get_item(item_id)
            .await?
            .ok_or(CofferError::ItemNotFound(*item_id))?;
        self.authorize(caller, &item.chest_id, Role::Viewer).await?;
        Ok(item)
    }

    /// List a chest's items. Requires `Viewer` or better.
    pub async fn list_items(&self, caller: &Caller, chest_id: &ChestId) -> Result<Vec<Item>> {
        self.authorize(caller, chest_id, Role::Viewer).await?;
        Ok(self.store.list_items(chest_id).await?)
    }

    /// Remove an item. Requires `Editor` or better on its chest.
    pub async fn remove_item(&self, caller: &Caller, item_id: &ItemId) -> Result<()> {
        let item = self
            .store
            .get_item(item_id)
            .await?
            .ok_or(CofferError::ItemNotFound(*item_id))?;
        self.authorize(caller, &item.chest_id, Role::Editor).await?;

        if !self.store.delete_item(item_id).await? {
            return Err(CofferError::ItemNotFound(*item_id));
        }
        tracing::debug!(chest = %item.chest_id, item = %item_id, "item removed");
        Ok(())
    }
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}
