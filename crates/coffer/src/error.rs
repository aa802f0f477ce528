//! Error types for the Coffer facade.

use coffer_core::{ChestId, Email, ItemId};
use coffer_perms::PermsError;
use coffer_store::{DirectoryError, StoreError};
use thiserror::Error;

/// Errors that can occur during Coffer operations.
#[derive(Debug, Error)]
pub enum CofferError {
    /// No caller identity was supplied.
    #[error("not authenticated")]
    Unauthenticated,

    /// Chest not found.
    #[error("chest not found: {0}")]
    ChestNotFound(ChestId),

    /// Item not found.
    #[error("item not found: {0}")]
    ItemNotFound(ItemId),

    /// Invite not found (includes already-redeemed and revoked invites).
    #[error("invite not found")]
    InviteNotFound,

    /// Authorization failure from the permission layer.
    #[error(transparent)]
    Denied(#[from] PermsError),

    /// The caller's verified email does not match the invite's.
    #[error("invite is addressed to a different email")]
    Forbidden,

    /// An outstanding invite already exists for this chest and email.
    #[error("outstanding invite already exists for {0}")]
    DuplicateInvite(Email),

    /// The caller already holds access to the chest.
    #[error("already a collaborator on chest {0}")]
    AlreadyCollaborator(ChestId),

    /// The invite's expiry has passed.
    #[error("invite expired at {expires_at}")]
    InviteExpired { expires_at: i64 },

    /// Identity provider failure.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for Coffer operations.
pub type Result<T> = std::result::Result<T, CofferError>;
