//! Database schema migrations for SQLite.
//!
//! We use a simple versioned migration system. Each migration is a SQL
//! string that transforms the schema from version N to N+1.

use rusqlite::Connection;

use crate::error::{Result, StoreError};

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Initialize or migrate the database schema.
///
/// This function is idempotent - it can be called multiple times safely.
pub fn migrate(conn: &mut Connection) -> Result<()> {
    // Create migrations table if it doesn't exist
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    // Get current version
    let current: u32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    // Apply migrations
    if current < CURRENT_VERSION {
        let tx = conn.transaction()?;

        for version in (current + 1)..=CURRENT_VERSION {
            tracing::info!(version, "applying schema migration");
            apply_migration(&tx, version)?;

            tx.execute(
                "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
                rusqlite::params![version, now_millis()],
            )?;
        }

        tx.commit()?;
    }

    Ok(())
}

/// Apply a specific migration version.
fn apply_migration(conn: &Connection, version: u32) -> Result<()> {
    match version {
        1 => apply_v1(conn),
        _ => Err(StoreError::Migration(format!(
            "unknown migration version: {}",
            version
        ))),
    }
}

/// Migration v1: Initial schema.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Chests: one row per collection; the owner is a column here,
        -- never a permission row.
        CREATE TABLE chests (
            chest_id BLOB PRIMARY KEY,        -- 16 bytes
            name TEXT NOT NULL,
            owner_id BLOB NOT NULL,           -- 16 bytes, immutable
            description TEXT,                 -- nullable
            created_at INTEGER NOT NULL       -- Unix ms
        );

        -- Permission rows for non-owner collaborators.
        CREATE TABLE permissions (
            chest_id BLOB NOT NULL,
            user_id BLOB NOT NULL,
            role INTEGER NOT NULL,            -- Role discriminant (0..=2 stored)
            granted_at INTEGER NOT NULL,      -- Unix ms

            PRIMARY KEY (chest_id, user_id)
        );

        -- Pending invites. Redeemed invites are deleted, not flagged.
        CREATE TABLE invites (
            invite_id BLOB PRIMARY KEY,       -- 16 bytes
            chest_id BLOB NOT NULL,
            email TEXT NOT NULL,              -- case-sensitive match at redeem
            role INTEGER NOT NULL,
            invited_by BLOB NOT NULL,         -- 16 bytes
            token TEXT NOT NULL UNIQUE,       -- hex, system-wide unique
            created_at INTEGER NOT NULL,      -- Unix ms
            expires_at INTEGER NOT NULL       -- Unix ms, fixed at creation
        );

        -- Items. Body and tags are CBOR blobs.
        CREATE TABLE items (
            item_id BLOB PRIMARY KEY,         -- 16 bytes
            chest_id BLOB NOT NULL,
            created_by BLOB NOT NULL,         -- 16 bytes
            body BLOB NOT NULL,               -- CBOR ItemBody
            tags BLOB NOT NULL,               -- CBOR array of strings
            event_at INTEGER,                 -- nullable Unix ms
            created_at INTEGER NOT NULL       -- Unix ms
        );

        -- Indexes for common queries
        CREATE INDEX idx_chests_owner ON chests(owner_id);
        CREATE INDEX idx_permissions_user ON permissions(user_id);
        CREATE INDEX idx_invites_chest_email ON invites(chest_id, email);
        CREATE INDEX idx_items_chest ON items(chest_id);
        "#,
    )?;

    Ok(())
}

/// Get current time in milliseconds.
fn now_millis() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creates_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();

        assert!(tables.contains(&"chests".to_string()));
        assert!(tables.contains(&"permissions".to_string()));
        assert!(tables.contains(&"invites".to_string()));
        assert!(tables.contains(&"items".to_string()));
        assert!(tables.contains(&"schema_migrations".to_string()));
    }

    #[test]
    fn test_migration_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        migrate(&mut conn).unwrap(); // Should not error
        migrate(&mut conn).unwrap(); // Still should not error

        let version: u32 = conn
            .query_row(
                "SELECT MAX(version) FROM schema_migrations",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(version, 1);
    }
}
