//! Caller identity.
//!
//! Authentication happens outside this crate. The embedding layer hands
//! every operation a [`Caller`] it has already verified; an anonymous
//! request never gets past [`Caller::require`].

use coffer_core::{Email, UserId};

use crate::error::{CofferError, Result};

/// A verified caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: UserId,
    /// Verified by the identity provider; invite redemption matches
    /// against this exact string.
    pub email: Email,
}

impl Caller {
    pub fn new(user_id: UserId, email: Email) -> Self {
        Self { user_id, email }
    }

    /// Reject anonymous requests.
    pub fn require(caller: Option<Caller>) -> Result<Caller> {
        caller.ok_or(CofferError::Unauthenticated)
    }
}
