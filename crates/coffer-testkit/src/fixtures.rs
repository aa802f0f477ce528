//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;

use coffer_core::{Chest, ChestId, Email, UserId};
use coffer_perms::{Invite, Permission, Role, DEFAULT_INVITE_TTL_MS};
use coffer_store::{
    InviteInsert, MemoryDirectory, MemoryStore, PermissionInsert, Store, UserProfile,
};

/// A test fixture with a memory store and a memory user directory.
///
/// Both are behind `Arc` so tests can hand clones to a facade while
/// keeping direct access for seeding and assertions.
pub struct TestFixture {
    pub store: Arc<MemoryStore>,
    pub directory: Arc<MemoryDirectory>,
}

impl TestFixture {
    /// Create an empty fixture.
    pub fn new() -> Self {
        Self {
            store: Arc::new(MemoryStore::new()),
            directory: Arc::new(MemoryDirectory::new()),
        }
    }

    /// Register a user named `name` with the email `name@example.com`.
    pub fn register_user(&self, name: &str) -> UserProfile {
        let profile = UserProfile {
            id: UserId::random(),
            email: Email::new(format!("{}@example.com", name))
                .unwrap_or_else(|e| panic!("bad fixture user name {:?}: {}", name, e)),
            display_name: Some(name.to_string()),
        };
        self.directory.put(profile.clone());
        profile
    }

    /// Insert a chest owned by `owner`.
    pub async fn seed_chest(&self, owner: UserId, name: &str) -> Chest {
        let chest = Chest::new(owner, name, None, now_millis());
        self.store
            .insert_chest(&chest)
            .await
            .unwrap_or_else(|e| panic!("seed_chest: {}", e));
        chest
    }

    /// Grant `user` a role on a chest directly, bypassing the invite flow.
    pub async fn seed_permission(&self, chest_id: ChestId, user: UserId, role: Role) {
        let grant = Permission::new(chest_id, user, role, now_millis());
        let outcome = self
            .store
            .insert_permission(&grant)
            .await
            .unwrap_or_else(|e| panic!("seed_permission: {}", e));
        assert_eq!(outcome, PermissionInsert::Inserted, "seed_permission");
    }

    /// Insert an outstanding invite for `email` with the default TTL.
    pub async fn seed_invite(
        &self,
        chest_id: ChestId,
        email: Email,
        role: Role,
        invited_by: UserId,
    ) -> Invite {
        let now = now_millis();
        let invite = Invite::new(chest_id, email, role, invited_by, now, DEFAULT_INVITE_TTL_MS);
        let outcome = self
            .store
            .insert_invite(&invite, now)
            .await
            .unwrap_or_else(|e| panic!("seed_invite: {}", e));
        assert_eq!(outcome, InviteInsert::Inserted, "seed_invite");
        invite
    }

    /// Insert an invite that expired `age_ms` milliseconds ago.
    pub async fn seed_expired_invite(
        &self,
        chest_id: ChestId,
        email: Email,
        role: Role,
        invited_by: UserId,
        age_ms: i64,
    ) -> Invite {
        let now = now_millis();
        let invite = Invite::new(chest_id, email, role, invited_by, now - age_ms - 1, age_ms);
        let outcome = self
            .store
            .insert_invite(&invite, now)
            .await
            .unwrap_or_else(|e| panic!("seed_expired_invite: {}", e));
        assert_eq!(outcome, InviteInsert::Inserted, "seed_expired_invite");
        invite
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// A fixture pre-populated with `count` registered users.
pub fn multi_user_fixture(count: usize) -> (TestFixture, Vec<UserProfile>) {
    let fixture = TestFixture::new();
    let users = (0..count)
        .map(|i| fixture.register_user(&format!("user{}", i)))
        .collect();
    (fixture, users)
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}
