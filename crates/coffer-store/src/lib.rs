//! Storage layer for Coffer.
//!
//! The [`Store`] trait is the single logical document store the rest of
//! the workspace talks to. Implementations:
//!
//! - [`SqliteStore`] — primary backend, rusqlite with bundled SQLite.
//! - [`MemoryStore`] — same semantics, no persistence; for tests.
//!
//! Compound operations (cascade delete, invite consumption) are atomic
//! within a single store call; the store's isolation is the only
//! concurrency primitive the system relies on.
//!
//! The [`UserDirectory`] trait is the seam to the external identity
//! provider; users are never persisted here.

pub mod directory;
pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use directory::{DirectoryError, MemoryDirectory, UserDirectory, UserProfile};
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{
    Cascade, ChestUpdate, ConsumeOutcome, InviteInsert, PermissionInsert, Store,
};
