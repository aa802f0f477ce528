//! Authorization checks.
//!
//! Callers first resolve their effective role (or `None`) via
//! `coffer::resolver`, then gate the operation with one of these
//! functions.

use crate::error::PermsError;
use crate::role::Role;

/// Require at least `required`; returns the effective role on success.
///
/// `None` (no access at all) and an insufficient role both map to
/// [`PermsError::AccessDenied`] so callers cannot distinguish a chest
/// they may not see from one they may only partially use.
pub fn require(role: Option<Role>, required: Role) -> Result<Role, PermsError> {
    match role {
        Some(role) if role >= required => Ok(role),
        _ => Err(PermsError::AccessDenied { required }),
    }
}

/// Require the literal owner. Delegated `Admin` is not sufficient;
/// irreversible destruction is gated on ownership.
pub fn require_owner(role: Option<Role>) -> Result<(), PermsError> {
    match role {
        Some(Role::Owner) => Ok(()),
        _ => Err(PermsError::OwnerRequired),
    }
}

/// Reject roles that cannot be granted by invite.
pub fn ensure_grantable(role: Role) -> Result<(), PermsError> {
    if role.is_grantable() {
        Ok(())
    } else {
        Err(PermsError::UngrantableRole(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_is_one_comparison() {
        assert_eq!(require(Some(Role::Owner), Role::Admin).unwrap(), Role::Owner);
        assert_eq!(require(Some(Role::Admin), Role::Admin).unwrap(), Role::Admin);
        assert!(require(Some(Role::Editor), Role::Admin).is_err());
        assert!(require(None, Role::Viewer).is_err());
    }

    #[test]
    fn test_owner_gate_rejects_admin() {
        assert!(require_owner(Some(Role::Owner)).is_ok());
        assert!(matches!(
            require_owner(Some(Role::Admin)),
            Err(PermsError::OwnerRequired)
        ));
        assert!(require_owner(None).is_err());
    }

    #[test]
    fn test_grantable() {
        assert!(ensure_grantable(Role::Viewer).is_ok());
        assert!(matches!(
            ensure_grantable(Role::Owner),
            Err(PermsError::UngrantableRole(Role::Owner))
        ));
    }
}
