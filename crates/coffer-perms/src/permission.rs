//! The permission row: a non-owner user's role on a chest.

use serde::{Deserialize, Serialize};

use coffer_core::{ChestId, UserId};

use crate::role::Role;

/// Grants `user_id` the given role on `chest_id`.
///
/// At most one row exists per `(chest_id, user_id)` pair, and the chest's
/// owner never holds a row for their own chest; both invariants are
/// enforced by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub chest_id: ChestId,
    pub user_id: UserId,
    pub role: Role,
    /// When the role was granted (Unix ms).
    pub granted_at: i64,
}

impl Permission {
    pub fn new(chest_id: ChestId, user_id: UserId, role: Role, now: i64) -> Self {
        Self {
            chest_id,
            user_id,
            role,
            granted_at: now,
        }
    }
}
