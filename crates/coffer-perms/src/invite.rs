//! Pending invites: time-limited offers of a role on a chest.

use serde::{Deserialize, Serialize};

use coffer_core::{ChestId, Email, InviteId, UserId};

use crate::role::Role;
use crate::token::InviteToken;

/// Default invite lifetime: 7 days, in milliseconds.
pub const DEFAULT_INVITE_TTL_MS: i64 = 7 * 24 * 60 * 60 * 1000;

/// A pending offer of `role` on `chest_id` to whoever can authenticate
/// as `email`.
///
/// There is no status field: redeeming an invite deletes the row in the
/// same transaction that writes the permission, so an invite that still
/// exists is either outstanding or expired, nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invite {
    pub id: InviteId,
    pub chest_id: ChestId,
    pub email: Email,
    pub role: Role,
    pub invited_by: UserId,
    pub token: InviteToken,
    /// Issuance time (Unix ms).
    pub created_at: i64,
    /// Fixed at issuance, never extended (Unix ms).
    pub expires_at: i64,
}

impl Invite {
    /// Issue a new invite with a fresh id and token.
    pub fn new(
        chest_id: ChestId,
        email: Email,
        role: Role,
        invited_by: UserId,
        now: i64,
        ttl_ms: i64,
    ) -> Self {
        Self {
            id: InviteId::random(),
            chest_id,
            email,
            role,
            invited_by,
            token: InviteToken::generate(),
            created_at: now,
            expires_at: now.saturating_add(ttl_ms),
        }
    }

    /// Whether the invite has passed its expiry.
    ///
    /// An invite is still redeemable at the exact expiry instant.
    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at
    }

    /// Replace the token with a freshly generated one.
    ///
    /// Used when the store reports a token collision at insert.
    pub fn regenerate_token(&mut self) {
        self.token = InviteToken::generate();
    }
}
