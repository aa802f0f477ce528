//! # Coffer
//!
//! The unified API for Coffer - user-owned chests of items, shared with
//! collaborators at graduated trust levels.
//!
//! ## Overview
//!
//! Coffer provides an embeddable library for:
//!
//! - **Chests**: Named collections with exactly one owner
//! - **Roles**: A totally ordered ladder, `Owner > Admin > Editor > Viewer`
//! - **Invites**: Email-bound, time-limited, single-use tokens that grant
//!   a role when redeemed
//! - **Items**: Notes, links, todos, and blob-backed files inside a chest
//!
//! ## Key Concepts
//!
//! - **Ownership is implicit**: the owner is a column on the chest, never
//!   a permission row, and always resolves to `Owner`.
//! - **Invites are consumed**: redeeming deletes the invite and inserts
//!   the permission in one transaction.
//! - **Deletion cascades**: removing a chest removes its permissions,
//!   invites, and items atomically.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use coffer::{Caller, Coffer, CofferConfig};
//! use coffer::store::{MemoryDirectory, SqliteStore};
//! use coffer::core::{Email, UserId};
//!
//! async fn example() {
//!     let store = Arc::new(SqliteStore::open("coffer.db").unwrap());
//!     let directory = Arc::new(MemoryDirectory::new());
//!     let coffer = Coffer::new(store, directory, CofferConfig::default());
//!
//!     let ada = Caller::new(UserId::random(), Email::new("ada@example.com").unwrap());
//!     let chest = coffer
//!         .create_chest(&ada, "Reading list", None)
//!         .await
//!         .unwrap();
//!     println!("created {}", chest.id);
//! }
//! ```
//!
//! ## Re-exports
//!
//! This crate re-exports the component crates for convenience:
//!
//! - `coffer::core` - Core records (Chest, Item, ids, Email)
//! - `coffer::perms` - Roles, permissions, invites
//! - `coffer::store` - Storage abstraction, SQLite and memory backends

pub mod caller;
pub mod coffer;
pub mod error;
pub mod resolver;

// Re-export component crates
pub use coffer_core as core;
pub use coffer_perms as perms;
pub use coffer_store as store;

// Re-export main types for convenience
pub use caller::Caller;
pub use coffer::{ChestView, Coffer, CofferConfig, Collaborator, CollaboratorList, MyChests};
pub use error::{CofferError, Result};

// Re-export commonly used component types
pub use coffer_core::{Chest, ChestId, Email, InviteId, Item, ItemBody, ItemDraft, ItemId, UserId};
pub use coffer_perms::{Invite, InviteToken, Permission, Role};
pub use coffer_store::{Cascade, ChestUpdate, Store, UserDirectory, UserProfile};
