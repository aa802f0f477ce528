//! Store trait: the abstract interface for chest persistence.
//!
//! This trait keeps the facade storage-agnostic. Implementations include
//! SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;

use coffer_core::{Chest, ChestId, Email, InviteId, Item, ItemId, UserId};
use coffer_perms::{Invite, InviteToken, Permission};

use crate::error::Result;

/// Result of inserting a permission row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionInsert {
    /// Row was inserted.
    Inserted,
    /// A row for this `(chest_id, user_id)` already exists; nothing changed.
    AlreadyExists,
    /// The parent chest no longer exists; nothing changed.
    ChestGone,
}

/// Result of inserting an invite row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InviteInsert {
    /// Row was inserted.
    Inserted,
    /// An outstanding (non-expired) invite already exists for this
    /// `(chest_id, email)`; nothing changed.
    DuplicateOutstanding,
    /// Another invite already carries this token; nothing changed.
    TokenExists,
    /// The parent chest no longer exists; nothing changed.
    ChestGone,
}

/// Result of atomically consuming an invite into a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// Invite deleted and permission inserted in one transaction.
    Consumed,
    /// The invite row no longer exists (already redeemed or revoked).
    InviteGone,
    /// The grantee already holds a permission row on the chest; the
    /// invite was left untouched.
    PermissionExists,
}

/// Row counts removed by a cascading chest delete.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cascade {
    pub permissions: usize,
    pub invites: usize,
    pub items: usize,
}

/// Partial update of a chest's mutable fields.
///
/// Outer `None` leaves a field untouched; `description: Some(None)`
/// clears the description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChestUpdate {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
}

impl ChestUpdate {
    pub fn rename(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = Some(Some(description.into()));
        self
    }

    pub fn clear_description(mut self) -> Self {
        self.description = Some(None);
        self
    }

    /// True when no field is supplied.
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.description.is_none()
    }
}

/// The Store trait: async interface for chest persistence.
///
/// All methods are async to support both sync (SQLite) and async
/// backends. For SQLite, calls run under `spawn_blocking` internally.
///
/// # Design Notes
///
/// - **Uniqueness by outcome enum**: inserts that can collide report via
///   [`PermissionInsert`] / [`InviteInsert`] rather than errors, so the
///   caller owns the taxonomy.
/// - **Atomic compounds**: [`Store::delete_chest`] and
///   [`Store::consume_invite`] are single transactions; no reader may
///   observe their intermediate states.
/// - **No sweeping**: expired invites stay until redeemed-with-failure,
///   revoked, or cascaded away; expiry is a read-time predicate.
#[async_trait]
pub trait Store: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Chest Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a freshly created chest.
    async fn insert_chest(&self, chest: &Chest) -> Result<()>;

    /// Get a chest by id.
    async fn get_chest(&self, id: &ChestId) -> Result<Option<Chest>>;

    /// Apply a partial update. Returns `false` if the chest is gone.
    async fn update_chest(&self, id: &ChestId, update: &ChestUpdate) -> Result<bool>;

    /// Delete a chest and every permission, invite, and item scoped to
    /// it, as one transaction. Returns `None` if the chest is gone.
    async fn delete_chest(&self, id: &ChestId) -> Result<Option<Cascade>>;

    /// Chests whose `owner_id` is `owner`, ordered by creation time.
    async fn list_chests_owned_by(&self, owner: &UserId) -> Result<Vec<Chest>>;

    /// Chests the user holds a permission row on, ordered by creation time.
    async fn list_chests_shared_with(&self, user: &UserId) -> Result<Vec<Chest>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Permission Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// The unique `(chest_id, user_id)` row, if present.
    async fn get_permission(
        &self,
        chest_id: &ChestId,
        user_id: &UserId,
    ) -> Result<Option<Permission>>;

    /// Insert a permission row unless one already exists for the pair
    /// or the parent chest is gone.
    async fn insert_permission(&self, permission: &Permission) -> Result<PermissionInsert>;

    /// Delete the pair's row. Returns `false` when there was none.
    async fn delete_permission(&self, chest_id: &ChestId, user_id: &UserId) -> Result<bool>;

    /// All permission rows for a chest, ordered by grant time.
    async fn list_permissions(&self, chest_id: &ChestId) -> Result<Vec<Permission>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Invite Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert an invite, enforcing uniqueness in one transaction: the
    /// parent chest must still exist, no outstanding (non-expired at
    /// `now`) invite may target the same `(chest_id, email)`, and the
    /// token must not collide.
    async fn insert_invite(&self, invite: &Invite, now: i64) -> Result<InviteInsert>;

    /// Get an invite by id.
    async fn get_invite(&self, id: &InviteId) -> Result<Option<Invite>>;

    /// Get an invite by its token.
    async fn get_invite_by_token(&self, token: &InviteToken) -> Result<Option<Invite>>;

    /// The outstanding (non-expired at `now`) invite for
    /// `(chest_id, email)`, if any. Expired leftovers are ignored.
    async fn find_outstanding_invite(
        &self,
        chest_id: &ChestId,
        email: &Email,
        now: i64,
    ) -> Result<Option<Invite>>;

    /// All invite rows for a chest, ordered by creation time. Includes
    /// expired rows; callers filter.
    async fn list_invites(&self, chest_id: &ChestId) -> Result<Vec<Invite>>;

    /// Delete an invite row. Returns `false` when there was none.
    async fn delete_invite(&self, id: &InviteId) -> Result<bool>;

    /// Atomically delete the invite and insert `grant`.
    ///
    /// Exactly one of two racing consumers of the same invite succeeds;
    /// the loser observes [`ConsumeOutcome::InviteGone`] or
    /// [`ConsumeOutcome::PermissionExists`], never a second grant row.
    async fn consume_invite(&self, id: &InviteId, grant: &Permission) -> Result<ConsumeOutcome>;

    // ─────────────────────────────────────────────────────────────────────────
    // Item Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert an item. Returns `false` when the parent chest is gone,
    /// so a cascade that has begun cannot leak new children.
    async fn insert_item(&self, item: &Item) -> Result<bool>;

    /// Get an item by id.
    async fn get_item(&self, id: &ItemId) -> Result<Option<Item>>;

    /// All items in a chest, ordered by creation time.
    async fn list_items(&self, chest_id: &ChestId) -> Result<Vec<Item>>;

    /// Delete an item. Returns `false` when there was none.
    async fn delete_item(&self, id: &ItemId) -> Result<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chest_update_builder() {
        let update = ChestUpdate::default().rename("Trips").clear_description();
        assert_eq!(update.name.as_deref(), Some("Trips"));
        assert_eq!(update.description, Some(None));
        assert!(!update.is_empty());
        assert!(ChestUpdate::default().is_empty());
    }
}
