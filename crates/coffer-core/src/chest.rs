//! The chest record.

use serde::{Deserialize, Serialize};

use crate::types::{ChestId, UserId};

/// A named collection of items owned by exactly one user.
///
/// `owner_id` is immutable after creation and is never mirrored into the
/// permission table; ownership is implicit, not a row. See
/// `coffer::resolver` for how that invariant is enforced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chest {
    pub id: ChestId,
    pub name: String,
    pub owner_id: UserId,
    pub description: Option<String>,
    /// Creation time (Unix ms).
    pub created_at: i64,
}

impl Chest {
    /// Create a new chest with a fresh id.
    pub fn new(
        owner_id: UserId,
        name: impl Into<String>,
        description: Option<String>,
        now: i64,
    ) -> Self {
        Self {
            id: ChestId::random(),
            name: name.into(),
            owner_id,
            description,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_chest_fresh_ids() {
        let owner = UserId::random();
        let a = Chest::new(owner, "Groceries", None, 1000);
        let b = Chest::new(owner, "Groceries", None, 1000);
        assert_ne!(a.id, b.id);
        assert_eq!(a.owner_id, b.owner_id);
    }
}
