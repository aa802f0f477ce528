//! The role tier a user holds on a chest.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use coffer_core::ParseError;

/// Permission tiers in increasing order of authority.
///
/// The derived `Ord` makes every authorization check a single comparison
/// (`role >= required`) instead of set-membership tests scattered per
/// operation. `Owner` is resolved from the chest record and never stored
/// in the permission table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// May read the chest and its items.
    Viewer,
    /// May additionally create and remove items.
    Editor,
    /// May additionally rename the chest, invite, and remove collaborators.
    Admin,
    /// The chest's creator. May additionally delete the chest. Implicit.
    Owner,
}

impl Role {
    /// Stable storage discriminant.
    pub fn to_u8(self) -> u8 {
        match self {
            Role::Viewer => 0,
            Role::Editor => 1,
            Role::Admin => 2,
            Role::Owner => 3,
        }
    }

    /// Parse the storage discriminant.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Role::Viewer),
            1 => Some(Role::Editor),
            2 => Some(Role::Admin),
            3 => Some(Role::Owner),
            _ => None,
        }
    }

    /// Whether this role may be granted via an invite.
    ///
    /// Ownership is never grantable; it exists only on the chest record.
    pub fn is_grantable(self) -> bool {
        self != Role::Owner
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Viewer => "viewer",
            Role::Editor => "editor",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "viewer" => Ok(Role::Viewer),
            "editor" => Ok(Role::Editor),
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            other => Err(ParseError::UnknownRole(other.to_string())),
        }
    }
}
