//! Roles, permissions, and invites for Coffer.
//!
//! Access to a chest is chest-wide and tiered: `Owner > Admin > Editor >
//! Viewer`. Ownership is implicit on the chest record; everything below
//! it is a [`Permission`] row, created either directly or by redeeming a
//! time-limited [`Invite`].

pub mod error;
pub mod invite;
pub mod permission;
pub mod policy;
pub mod role;
pub mod token;

pub use error::PermsError;
pub use invite::{Invite, DEFAULT_INVITE_TTL_MS};
pub use permission::Permission;
pub use policy::{ensure_grantable, require, require_owner};
pub use role::Role;
pub use token::InviteToken;
