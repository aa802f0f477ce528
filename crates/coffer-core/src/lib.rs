//! Core domain types for Coffer.
//!
//! A *chest* is a named collection of heterogeneous items owned by exactly
//! one user. This crate defines the records and identifier newtypes the
//! rest of the workspace builds on; access control lives in `coffer-perms`
//! and persistence in `coffer-store`.

pub mod chest;
pub mod error;
pub mod item;
pub mod types;

pub use chest::Chest;
pub use error::ParseError;
pub use item::{BlobRef, Item, ItemBody, ItemDraft, ItemKind};
pub use types::{ChestId, Email, InviteId, ItemId, UserId};
