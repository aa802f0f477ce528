//! The seam to the external identity provider.
//!
//! Users are owned and managed elsewhere; Coffer only ever reads public
//! profiles through this trait. The in-memory implementation backs tests
//! and single-process embeddings.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use coffer_core::{Email, UserId};

/// Failure while reaching the identity provider.
#[derive(Debug, Error)]
#[error("identity provider error: {0}")]
pub struct DirectoryError(pub String);

/// A user's public identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: Email,
    pub display_name: Option<String>,
}

/// Read-only lookup of user profiles.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a user's public profile. `None` means the user record no
    /// longer exists (deleted accounts are not an error).
    async fn get(&self, id: &UserId) -> Result<Option<UserProfile>, DirectoryError>;
}

/// In-memory directory. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryDirectory {
    users: RwLock<HashMap<UserId, UserProfile>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a profile.
    pub fn put(&self, profile: UserProfile) {
        self.users.write().unwrap().insert(profile.id, profile);
    }

    /// Delete a profile, simulating an account deletion.
    pub fn remove(&self, id: &UserId) -> Option<UserProfile> {
        self.users.write().unwrap().remove(id)
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn get(&self, id: &UserId) -> Result<Option<UserProfile>, DirectoryError> {
        Ok(self.users.read().unwrap().get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_remove() {
        let directory = MemoryDirectory::new();
        let id = UserId::random();
        directory.put(UserProfile {
            id,
            email: Email::new("a@x.com").unwrap(),
            display_name: Some("Ada".into()),
        });

        let profile = directory.get(&id).await.unwrap().unwrap();
        assert_eq!(profile.email.as_str(), "a@x.com");

        directory.remove(&id);
        assert!(directory.get(&id).await.unwrap().is_none());
    }
}
