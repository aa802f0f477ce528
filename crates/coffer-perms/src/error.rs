//! Error types for authorization.

use thiserror::Error;

use crate::role::Role;

/// Authorization failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PermsError {
    #[error("access denied: requires {required} or better")]
    AccessDenied { required: Role },

    #[error("only the chest owner may perform this operation")]
    OwnerRequired,

    #[error("role {0} cannot be granted by invite")]
    UngrantableRole(Role),
}
