//! In-memory implementation of the Store trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence. Compound
//! operations hold the single write guard for their whole duration,
//! which gives them the same all-or-nothing visibility as a SQLite
//! transaction.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use coffer_core::{Chest, ChestId, Email, InviteId, Item, ItemId, UserId};
use coffer_perms::{Invite, InviteToken, Permission};

use crate::error::Result;
use crate::traits::{
    Cascade, ChestUpdate, ConsumeOutcome, InviteInsert, PermissionInsert, Store,
};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

struct MemoryStoreInner {
    /// Chests indexed by id.
    chests: HashMap<ChestId, Chest>,

    /// Permission rows, keyed by the unique pair.
    permissions: HashMap<(ChestId, UserId), Permission>,

    /// Invites indexed by id.
    invites: HashMap<InviteId, Invite>,

    /// Token index: token -> invite id. Mirrors the SQLite UNIQUE column.
    tokens: HashMap<InviteToken, InviteId>,

    /// Items indexed by id.
    items: HashMap<ItemId, Item>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner {
                chests: HashMap::new(),
                permissions: HashMap::new(),
                invites: HashMap::new(),
                tokens: HashMap::new(),
                items: HashMap::new(),
            }),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_chest(&self, chest: &Chest) -> Result<()> {
        let mut inner = self.inner.write().unwrap();
        inner.chests.insert(chest.id, chest.clone());
        Ok(())
    }

    async fn get_chest(&self, id: &ChestId) -> Result<Option<Chest>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.chests.get(id).cloned())
    }

    async fn update_chest(&self, id: &ChestId, update: &ChestUpdate) -> Result<bool> {
        let mut inner = self.inner.write().unwrap();
        let Some(chest) = inner.chests.get_mut(id) else {
            return Ok(false);
        };
        if let Some(name) = &update.name {
            chest.name = name.clone();
        }
        if let Some(description) = &update.description {
            chest.description = description.clone();
        }
        Ok(true)
    }

    async fn delete_chest(&self, id: &ChestId) -> Result<Option<Cascade>> {
        let mut inner = self.inner.write().unwrap();
        if inner.chests.remove(id).is_none() {
            return Ok(None);
        }

        let before_permissions = inner.permissions.len();
        inner.permissions.retain(|(chest_id, _), _| chest_id != id);
        let permissions = before_permissions - inner.permissions.len();

        let dead_invites: Vec<InviteId> = inner
            .invites
            .values()
            .filter(|invite| invite.chest_id == *id)
            .map(|invite| invite.id)
            .collect();
        for invite_id in &dead_invites {
            if let Some(invite) = inner.invites.remove(invite_id) {
                inner.tokens.remove(&invite.token);
            }
        }

        let before_items = inner.items.len();
        inner.items.retain(|_, item| item.chest_id != *id);
        let items = before_items - inner.items.len();

        Ok(Some(Cascade {
            permissions,
            invites: dead_invites.len(),
            items,
        }))
    }

    async fn list_chests_owned_by(&self, owner: &UserId) -> Result<Vec<Chest>> {
        let inner = self.inner.read().unwrap();
        let mut chests: Vec<Chest> = inner
            .chests
            .values()
            .filter(|chest| chest.owner_id == *owner)
            .cloned()
            .collect();
        chests.sort_by_key(|chest| (chest.created_at, chest.id));
        Ok(chests)
    }

    async fn list_chests_shared_with(&self, user: &UserId) -> Result<Vec<Chest>> {
        let inner = self.inner.read().unwrap();
        let mut chests: Vec<Chest> = inner
            .permissions
            .keys()
            .filter(|(_, user_id)| user_id == user)
            .filter_map(|(chest_id, _)| inner.chests.get(chest_id).cloned())
            .collect();
        chests.sort_by_key(|chest| (chest.created_at, chest.id));
        Ok(chests)
    }

    async fn get_permission(
        &self,
        chest_id: &ChestId,
        user_id: &UserId,
    ) -> Result<Option<Permission>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.permissions.get(&(*chest_id, *user_id)).cloned())
    }

    async fn insert_permission(&self, permission: &Permission) -> Result<PermissionInsert> {
        let mut inner = self.inner.write().unwrap();
        if !inner.chests.contains_key(&permission.chest_id) {
            return Ok(PermissionInsert::ChestGone);
        }
        let key = (permission.chest_id, permission.user_id);
        if inner.permissions.contains_key(&key) {
            return Ok(PermissionInsert::AlreadyExists);
        }
        inner.permissions.insert(key, permission.clone());
        Ok(PermissionInsert::Inserted)
    }

    async fn delete_permission(&self, chest_id: &ChestId, user_id: &UserId) -> Result<bool> {
        let mut inner = self.inner.write().unwrap();
        Ok(inner.permissions.remove(&(*chest_id, *user_id)).is_some())
    }

    async fn list_permissions(&self, chest_id: &ChestId) -> Result<Vec<Permission>> {
        let inner = self.inner.read().unwrap();
        let mut permissions: Vec<Permission> = inner
            .permissions
            .values()
            .filter(|permission| permission.chest_id == *chest_id)
            .cloned()
            .collect();
        permissions.sort_by_key(|permission| (permission.granted_at, permission.user_id));
        Ok(permissions)
    }

    async fn insert_invite(&self, invite: &Invite, now: i64) -> Result<InviteInsert> {
        let mut inner = self.inner.write().unwrap();
        if !inner.chests.contains_key(&invite.chest_id) {
            return Ok(InviteInsert::ChestGone);
        }
        let outstanding = inner.invites.values().any(|existing| {
            existing.chest_id == invite.chest_id
                && existing.email == invite.email
                && !existing.is_expired(now)
        });
        if outstanding {
            return Ok(InviteInsert::DuplicateOutstanding);
        }
        if inner.tokens.contains_key(&invite.token) {
            return Ok(InviteInsert::TokenExists);
        }
        inner.tokens.insert(invite.token.clone(), invite.id);
        inner.invites.insert(invite.id, invite.clone());
        Ok(InviteInsert::Inserted)
    }

    async fn get_invite(&self, id: &InviteId) -> Result<Option<Invite>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.invites.get(id).cloned())
    }

    async fn get_invite_by_token(&self, token: &InviteToken) -> Result<Option<Invite>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .tokens
            .get(token)
            .and_then(|id| inner.invites.get(id))
            .cloned())
    }

    async fn find_outstanding_invite(
        &self,
        chest_id: &ChestId,
        email: &Email,
        now: i64,
    ) -> Result<Option<Invite>> {
        let inner = self.inner.read().unwrap();
        Ok(inner
            .invites
            .values()
            .find(|invite| {
                invite.chest_id == *chest_id
                    && invite.email == *email
                    && !invite.is_expired(now)
            })
            .cloned())
    }

    async fn list_invites(&self, chest_id: &ChestId) -> Result<Vec<Invite>> {
        let inner = self.inner.read().unwrap();
        let mut invites: Vec<Invite> = inner
            .invites
            .values()
            .filter(|invite| invite.chest_id == *chest_id)
            .cloned()
            .collect();
        invites.sort_by_key(|invite| (invite.created_at, invite.id));
        Ok(invites)
    }

    async fn delete_invite(&self, id: &InviteId) -> Result<bool> {
        let mut inner = self.inner.write().unwrap();
        match inner.invites.remove(id) {
            Some(invite) => {
                inner.tokens.remove(&invite.token);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn consume_invite(&self, id: &InviteId, grant: &Permission) -> Result<ConsumeOutcome> {
        // One write guard end to end: a racing consumer sees either the
        // invite or the permission, never both and never neither.
        let mut inner = self.inner.write().unwrap();

        if !inner.invites.contains_key(id) {
            return Ok(ConsumeOutcome::InviteGone);
        }

        let key = (grant.chest_id, grant.user_id);
        if inner.permissions.contains_key(&key) {
            return Ok(ConsumeOutcome::PermissionExists);
        }

        let invite = inner.invites.remove(id).expect("checked above");
        inner.tokens.remove(&invite.token);
        inner.permissions.insert(key, grant.clone());

        Ok(ConsumeOutcome::Consumed)
    }

    async fn insert_item(&self, item: &Item) -> Result<bool> {
        let mut inner = self.inner.write().unwrap();
        if !inner.chests.contains_key(&item.chest_id) {
            return Ok(false);
        }
        inner.items.insert(item.id, item.clone());
        Ok(true)
    }

    async fn get_item(&self, id: &ItemId) -> Result<Option<Item>> {
        let inner = self.inner.read().unwrap();
        Ok(inner.items.get(id).cloned())
    }

    async fn list_items(&self, chest_id: &ChestId) -> Result<Vec<Item>> {
        let inner = self.inner.read().unwrap();
        let mut items: Vec<Item> = inner
            .items
            .values()
            .filter(|item| item.chest_id == *chest_id)
            .cloned()
            .collect();
        items.sort_by_key(|item| (item.created_at, item.id));
        Ok(items)
    }

    async fn delete_item(&self, id: &ItemId) -> Result<bool> {
        let mut inner = self.inner.write().unwrap();
        Ok(inner.items.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coffer_core::{ItemBody, ItemDraft};
    use coffer_perms::{Role, DEFAULT_INVITE_TTL_MS};

    fn make_chest(owner: UserId) -> Chest {
        Chest::new(owner, "test", None, 1000)
    }

    #[tokio::test]
    async fn test_chest_roundtrip() {
        let store = MemoryStore::new();
        let chest = make_chest(UserId::random());

        store.insert_chest(&chest).await.unwrap();
        let fetched = store.get_chest(&chest.id).await.unwrap().unwrap();
        assert_eq!(fetched, chest);
    }

    #[tokio::test]
    async fn test_update_chest_partial() {
        let store = MemoryStore::new();
        let chest = make_chest(UserId::random());
        store.insert_chest(&chest).await.unwrap();

        let updated = store
            .update_chest(&chest.id, &ChestUpdate::default().rename("renamed"))
            .await
            .unwrap();
        assert!(updated);

        let fetched = store.get_chest(&chest.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "renamed");
        assert_eq!(fetched.description, chest.description);
    }

    #[tokio::test]
    async fn test_permission_uniqueness() {
        let store = MemoryStore::new();
        let chest = make_chest(UserId::random());
        let user = UserId::random();
        store.insert_chest(&chest).await.unwrap();

        let grant = Permission::new(chest.id, user, Role::Editor, 1);
        assert_eq!(
            store.insert_permission(&grant).await.unwrap(),
            PermissionInsert::Inserted
        );

        let second = Permission::new(chest.id, user, Role::Admin, 2);
        assert_eq!(
            store.insert_permission(&second).await.unwrap(),
            PermissionInsert::AlreadyExists
        );

        // Original row untouched.
        let row = store.get_permission(&chest.id, &user).await.unwrap().unwrap();
        assert_eq!(row.role, Role::Editor);
    }

    #[tokio::test]
    async fn test_consume_invite_once() {
        let store = MemoryStore::new();
        let owner = UserId::random();
        let chest = make_chest(owner);
        store.insert_chest(&chest).await.unwrap();

        let invite = Invite::new(
            chest.id,
            Email::new("b@x.com").unwrap(),
            Role::Editor,
            owner,
            1000,
            DEFAULT_INVITE_TTL_MS,
        );
        store.insert_invite(&invite, 1000).await.unwrap();

        let grantee = UserId::random();
        let grant = Permission::new(chest.id, grantee, Role::Editor, 2000);

        assert_eq!(
            store.consume_invite(&invite.id, &grant).await.unwrap(),
            ConsumeOutcome::Consumed
        );
        // Second attempt: the row is gone.
        assert_eq!(
            store.consume_invite(&invite.id, &grant).await.unwrap(),
            ConsumeOutcome::InviteGone
        );
        // Token lookup is gone too.
        assert!(store
            .get_invite_by_token(&invite.token)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_cascade_delete() {
        let store = MemoryStore::new();
        let owner = UserId::random();
        let chest = make_chest(owner);
        store.insert_chest(&chest).await.unwrap();

        let grant = Permission::new(chest.id, UserId::random(), Role::Viewer, 1);
        store.insert_permission(&grant).await.unwrap();

        let invite = Invite::new(
            chest.id,
            Email::new("c@x.com").unwrap(),
            Role::Viewer,
            owner,
            1000,
            DEFAULT_INVITE_TTL_MS,
        );
        store.insert_invite(&invite, 1000).await.unwrap();

        let item = Item::from_draft(
            chest.id,
            owner,
            ItemDraft::new(ItemBody::Note { text: "hi".into() }),
            1,
        );
        assert!(store.insert_item(&item).await.unwrap());

        let cascade = store.delete_chest(&chest.id).await.unwrap().unwrap();
        assert_eq!(
            cascade,
            Cascade {
                permissions: 1,
                invites: 1,
                items: 1
            }
        );

        assert!(store.get_chest(&chest.id).await.unwrap().is_none());
        assert!(store.get_item(&item.id).await.unwrap().is_none());
        assert!(store
            .get_invite_by_token(&invite.token)
            .await
            .unwrap()
            .is_none());
        // Deleting again reports the chest as gone.
        assert!(store.delete_chest(&chest.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_item_requires_chest() {
        let store = MemoryStore::new();
        let item = Item::from_draft(
            ChestId::random(),
            UserId::random(),
            ItemDraft::new(ItemBody::Note { text: "orphan".into() }),
            1,
        );
        assert!(!store.insert_item(&item).await.unwrap());
    }

    #[tokio::test]
    async fn test_inserts_rejected_after_cascade() {
        let store = MemoryStore::new();
        let owner = UserId::random();
        let chest = make_chest(owner);
        store.insert_chest(&chest).await.unwrap();
        store.delete_chest(&chest.id).await.unwrap();

        let grant = Permission::new(chest.id, UserId::random(), Role::Viewer, 1);
        assert_eq!(
            store.insert_permission(&grant).await.unwrap(),
            PermissionInsert::ChestGone
        );
        assert!(store
            .get_permission(&chest.id, &grant.user_id)
            .await
            .unwrap()
            .is_none());

        let invite = Invite::new(
            chest.id,
            Email::new("e@x.com").unwrap(),
            Role::Viewer,
            owner,
            1000,
            DEFAULT_INVITE_TTL_MS,
        );
        assert_eq!(
            store.insert_invite(&invite, 1000).await.unwrap(),
            InviteInsert::ChestGone
        );
        assert!(store.get_invite(&invite.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_invite_rejects_outstanding_duplicate() {
        let store = MemoryStore::new();
        let owner = UserId::random();
        let chest = make_chest(owner);
        store.insert_chest(&chest).await.unwrap();

        let email = Email::new("f@x.com").unwrap();
        let first = Invite::new(chest.id, email.clone(), Role::Viewer, owner, 1000, 500);
        assert_eq!(
            store.insert_invite(&first, 1000).await.unwrap(),
            InviteInsert::Inserted
        );

        // A distinct token does not help while the first is outstanding.
        let second = Invite::new(chest.id, email.clone(), Role::Editor, owner, 1200, 500);
        assert_eq!(
            store.insert_invite(&second, 1200).await.unwrap(),
            InviteInsert::DuplicateOutstanding
        );

        // Once the first has expired, the pair is free again.
        assert_eq!(
            store.insert_invite(&second, 1501).await.unwrap(),
            InviteInsert::Inserted
        );
    }

    #[tokio::test]
    async fn test_outstanding_invite_ignores_expired() {
        let store = MemoryStore::new();
        let owner = UserId::random();
        let chest = make_chest(owner);
        store.insert_chest(&chest).await.unwrap();

        let email = Email::new("d@x.com").unwrap();
        let invite = Invite::new(chest.id, email.clone(), Role::Viewer, owner, 1000, 500);
        store.insert_invite(&invite, 1000).await.unwrap();

        // Within the window.
        assert!(store
            .find_outstanding_invite(&chest.id, &email, 1500)
            .await
            .unwrap()
            .is_some());
        // Past it.
        assert!(store
            .find_outstanding_invite(&chest.id, &email, 1501)
            .await
            .unwrap()
            .is_none());
    }
}
