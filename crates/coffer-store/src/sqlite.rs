//! SQLite implementation of the Store trait.
//!
//! This is the primary storage backend. It uses rusqlite with bundled
//! SQLite, wrapped in async via tokio::spawn_blocking.

use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension};

use async_trait::async_trait;

use coffer_core::{Chest, ChestId, Email, InviteId, Item, ItemId, UserId};
use coffer_perms::{Invite, InviteToken, Permission, Role};

use crate::error::{Result, StoreError};
use crate::migration;
use crate::traits::{
    Cascade, ChestUpdate, ConsumeOutcome, InviteInsert, PermissionInsert, Store,
};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    /// The SQLite connection, protected by a mutex.
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the connection on the blocking pool.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut conn = conn
                .lock()
                .map_err(|e| StoreError::Connection(format!("mutex poisoned: {}", e)))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Connection(format!("spawn_blocking failed: {}", e)))?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row Conversion Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn bad_column(idx: usize, ty: rusqlite::types::Type, msg: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, msg.into())
}

fn blob_id<T>(idx: usize, bytes: &[u8]) -> rusqlite::Result<T>
where
    T: for<'a> TryFrom<&'a [u8], Error = std::array::TryFromSliceError>,
{
    T::try_from(bytes).map_err(|_| {
        bad_column(
            idx,
            rusqlite::types::Type::Blob,
            format!("id must be 16 bytes, got {}", bytes.len()),
        )
    })
}

fn decode_role(idx: usize, value: u8) -> rusqlite::Result<Role> {
    Role::from_u8(value).ok_or_else(|| {
        bad_column(
            idx,
            rusqlite::types::Type::Integer,
            format!("unknown role discriminant {}", value),
        )
    })
}

fn decode_cbor<T: serde::de::DeserializeOwned>(idx: usize, bytes: &[u8]) -> rusqlite::Result<T> {
    ciborium::from_reader(bytes)
        .map_err(|e| bad_column(idx, rusqlite::types::Type::Blob, e.to_string()))
}

fn encode_cbor<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)
        .map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok(buf)
}

fn row_to_chest(row: &rusqlite::Row<'_>) -> rusqlite::Result<Chest> {
    let id_bytes: Vec<u8> = row.get("chest_id")?;
    let owner_bytes: Vec<u8> = row.get("owner_id")?;

    Ok(Chest {
        id: blob_id(0, &id_bytes)?,
        name: row.get("name")?,
        owner_id: blob_id(2, &owner_bytes)?,
        description: row.get("description")?,
        created_at: row.get("created_at")?,
    })
}

fn row_to_permission(row: &rusqlite::Row<'_>) -> rusqlite::Result<Permission> {
    let chest_bytes: Vec<u8> = row.get("chest_id")?;
    let user_bytes: Vec<u8> = row.get("user_id")?;

    Ok(Permission {
        chest_id: blob_id(0, &chest_bytes)?,
        user_id: blob_id(1, &user_bytes)?,
        role: decode_role(2, row.get("role")?)?,
        granted_at: row.get("granted_at")?,
    })
}

fn row_to_invite(row: &rusqlite::Row<'_>) -> rusqlite::Result<Invite> {
    let id_bytes: Vec<u8> = row.get("invite_id")?;
    let chest_bytes: Vec<u8> = row.get("chest_id")?;
    let inviter_bytes: Vec<u8> = row.get("invited_by")?;
    let email: String = row.get("email")?;
    let token: String = row.get("token")?;

    Ok(Invite {
        id: blob_id(0, &id_bytes)?,
        chest_id: blob_id(1, &chest_bytes)?,
        email: Email::new(email)
            .map_err(|e| bad_column(2, rusqlite::types::Type::Text, e.to_string()))?,
        role: decode_role(3, row.get("role")?)?,
        invited_by: blob_id(4, &inviter_bytes)?,
        token: InviteToken::new(token),
        created_at: row.get("created_at")?,
        expires_at: row.get("expires_at")?,
    })
}

fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<Item> {
    let id_bytes: Vec<u8> = row.get("item_id")?;
    let chest_bytes: Vec<u8> = row.get("chest_id")?;
    let author_bytes: Vec<u8> = row.get("created_by")?;
    let body_cbor: Vec<u8> = row.get("body")?;
    let tags_cbor: Vec<u8> = row.get("tags")?;

    Ok(Item {
        id: blob_id(0, &id_bytes)?,
        chest_id: blob_id(1, &chest_bytes)?,
        created_by: blob_id(2, &author_bytes)?,
        body: decode_cbor(3, &body_cbor)?,
        tags: decode_cbor(4, &tags_cbor)?,
        event_at: row.get("event_at")?,
        created_at: row.get("created_at")?,
    })
}

const CHEST_COLUMNS: &str = "chest_id, name, owner_id, description, created_at";
const INVITE_COLUMNS: &str =
    "invite_id, chest_id, email, role, invited_by, token, created_at, expires_at";
const ITEM_COLUMNS: &str = "item_id, chest_id, created_by, body, tags, event_at, created_at";

#[async_trait]
impl Store for SqliteStore {
    // ─────────────────────────────────────────────────────────────────────────
    // Chest Operations
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_chest(&self, chest: &Chest) -> Result<()> {
        let chest = chest.clone();
        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO chests (chest_id, name, owner_id, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    chest.id.as_bytes().as_slice(),
                    &chest.name,
                    chest.owner_id.as_bytes().as_slice(),
                    &chest.description,
                    chest.created_at,
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn get_chest(&self, id: &ChestId) -> Result<Option<Chest>> {
        let id = *id;
        self.blocking(move |conn| {
            let chest = conn
                .query_row(
                    &format!("SELECT {} FROM chests WHERE chest_id = ?1", CHEST_COLUMNS),
                    params![id.as_bytes().as_slice()],
                    row_to_chest,
                )
                .optional()?;
            Ok(chest)
        })
        .await
    }

    async fn update_chest(&self, id: &ChestId, update: &ChestUpdate) -> Result<bool> {
        let id = *id;
        let update = update.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            let existing: Option<(String, Option<String>)> = tx
                .query_row(
                    "SELECT name, description FROM chests WHERE chest_id = ?1",
                    params![id.as_bytes().as_slice()],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let Some((mut name, mut description)) = existing else {
                return Ok(false);
            };

            if let Some(new_name) = update.name {
                name = new_name;
            }
            if let Some(new_description) = update.description {
                description = new_description;
            }

            tx.execute(
                "UPDATE chests SET name = ?2, description = ?3 WHERE chest_id = ?1",
                params![id.as_bytes().as_slice(), &name, &description],
            )?;

            tx.commit()?;
            Ok(true)
        })
        .await
    }

    async fn delete_chest(&self, id: &ChestId) -> Result<Option<Cascade>> {
        let id = *id;
        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM chests WHERE chest_id = ?1)",
                params![id.as_bytes().as_slice()],
                |row| row.get(0),
            )?;
            if !exists {
                return Ok(None);
            }

            let permissions = tx.execute(
                "DELETE FROM permissions WHERE chest_id = ?1",
                params![id.as_bytes().as_slice()],
            )?;
            let invites = tx.execute(
                "DELETE FROM invites WHERE chest_id = ?1",
                params![id.as_bytes().as_slice()],
            )?;
            let items = tx.execute(
                "DELETE FROM items WHERE chest_id = ?1",
                params![id.as_bytes().as_slice()],
            )?;
            tx.execute(
                "DELETE FROM chests WHERE chest_id = ?1",
                params![id.as_bytes().as_slice()],
            )?;

            tx.commit()?;
            Ok(Some(Cascade {
                permissions,
                invites,
                items,
            }))
        })
        .await
    }

    async fn list_chests_owned_by(&self, owner: &UserId) -> Result<Vec<Chest>> {
        let owner = *owner;
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM chests WHERE owner_id = ?1 ORDER BY created_at, chest_id",
                CHEST_COLUMNS
            ))?;
            let chests = stmt
                .query_map(params![owner.as_bytes().as_slice()], row_to_chest)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(chests)
        })
        .await
    }

    async fn list_chests_shared_with(&self, user: &UserId) -> Result<Vec<Chest>> {
        let user = *user;
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT c.chest_id, c.name, c.owner_id, c.description, c.created_at
                 FROM chests c
                 JOIN permissions p ON p.chest_id = c.chest_id
                 WHERE p.user_id = ?1
                 ORDER BY c.created_at, c.chest_id",
            )?;
            let chests = stmt
                .query_map(params![user.as_bytes().as_slice()], row_to_chest)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(chests)
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Permission Operations
    // ─────────────────────────────────────────────────────────────────────────

    async fn get_permission(
        &self,
        chest_id: &ChestId,
        user_id: &UserId,
    ) -> Result<Option<Permission>> {
        let chest_id = *chest_id;
        let user_id = *user_id;
        self.blocking(move |conn| {
            let permission = conn
                .query_row(
                    "SELECT chest_id, user_id, role, granted_at FROM permissions
                     WHERE chest_id = ?1 AND user_id = ?2",
                    params![chest_id.as_bytes().as_slice(), user_id.as_bytes().as_slice()],
                    row_to_permission,
                )
                .optional()?;
            Ok(permission)
        })
        .await
    }

    async fn insert_permission(&self, permission: &Permission) -> Result<PermissionInsert> {
        let permission = permission.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            let chest_exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM chests WHERE chest_id = ?1)",
                params![permission.chest_id.as_bytes().as_slice()],
                |row| row.get(0),
            )?;
            if !chest_exists {
                return Ok(PermissionInsert::ChestGone);
            }

            // Primary key on (chest_id, user_id) makes the existing row win.
            let changed = tx.execute(
                "INSERT OR IGNORE INTO permissions (chest_id, user_id, role, granted_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    permission.chest_id.as_bytes().as_slice(),
                    permission.user_id.as_bytes().as_slice(),
                    permission.role.to_u8(),
                    permission.granted_at,
                ],
            )?;
            if changed == 0 {
                return Ok(PermissionInsert::AlreadyExists);
            }

            tx.commit()?;
            Ok(PermissionInsert::Inserted)
        })
        .await
    }

    async fn delete_permission(&self, chest_id: &ChestId, user_id: &UserId) -> Result<bool> {
        let chest_id = *chest_id;
        let user_id = *user_id;
        self.blocking(move |conn| {
            let changed = conn.execute(
                "DELETE FROM permissions WHERE chest_id = ?1 AND user_id = ?2",
                params![chest_id.as_bytes().as_slice(), user_id.as_bytes().as_slice()],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn list_permissions(&self, chest_id: &ChestId) -> Result<Vec<Permission>> {
        let chest_id = *chest_id;
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT chest_id, user_id, role, granted_at FROM permissions
                 WHERE chest_id = ?1 ORDER BY granted_at, user_id",
            )?;
            let permissions = stmt
                .query_map(params![chest_id.as_bytes().as_slice()], row_to_permission)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(permissions)
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Invite Operations
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_invite(&self, invite: &Invite, now: i64) -> Result<InviteInsert> {
        let invite = invite.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            let chest_exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM chests WHERE chest_id = ?1)",
                params![invite.chest_id.as_bytes().as_slice()],
                |row| row.get(0),
            )?;
            if !chest_exists {
                return Ok(InviteInsert::ChestGone);
            }

            let outstanding: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM invites
                 WHERE chest_id = ?1 AND email = ?2 AND expires_at >= ?3)",
                params![
                    invite.chest_id.as_bytes().as_slice(),
                    invite.email.as_str(),
                    now,
                ],
                |row| row.get(0),
            )?;
            if outstanding {
                return Ok(InviteInsert::DuplicateOutstanding);
            }

            let token_taken: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM invites WHERE token = ?1)",
                params![invite.token.as_str()],
                |row| row.get(0),
            )?;
            if token_taken {
                return Ok(InviteInsert::TokenExists);
            }

            tx.execute(
                "INSERT INTO invites (
                    invite_id, chest_id, email, role, invited_by, token,
                    created_at, expires_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    invite.id.as_bytes().as_slice(),
                    invite.chest_id.as_bytes().as_slice(),
                    invite.email.as_str(),
                    invite.role.to_u8(),
                    invite.invited_by.as_bytes().as_slice(),
                    invite.token.as_str(),
                    invite.created_at,
                    invite.expires_at,
                ],
            )?;

            tx.commit()?;
            Ok(InviteInsert::Inserted)
        })
        .await
    }

    async fn get_invite(&self, id: &InviteId) -> Result<Option<Invite>> {
        let id = *id;
        self.blocking(move |conn| {
            let invite = conn
                .query_row(
                    &format!("SELECT {} FROM invites WHERE invite_id = ?1", INVITE_COLUMNS),
                    params![id.as_bytes().as_slice()],
                    row_to_invite,
                )
                .optional()?;
            Ok(invite)
        })
        .await
    }

    async fn get_invite_by_token(&self, token: &InviteToken) -> Result<Option<Invite>> {
        let token = token.clone();
        self.blocking(move |conn| {
            let invite = conn
                .query_row(
                    &format!("SELECT {} FROM invites WHERE token = ?1", INVITE_COLUMNS),
                    params![token.as_str()],
                    row_to_invite,
                )
                .optional()?;
            Ok(invite)
        })
        .await
    }

    async fn find_outstanding_invite(
        &self,
        chest_id: &ChestId,
        email: &Email,
        now: i64,
    ) -> Result<Option<Invite>> {
        let chest_id = *chest_id;
        let email = email.clone();
        self.blocking(move |conn| {
            let invite = conn
                .query_row(
                    &format!(
                        "SELECT {} FROM invites
                         WHERE chest_id = ?1 AND email = ?2 AND expires_at >= ?3
                         ORDER BY created_at LIMIT 1",
                        INVITE_COLUMNS
                    ),
                    params![chest_id.as_bytes().as_slice(), email.as_str(), now],
                    row_to_invite,
                )
                .optional()?;
            Ok(invite)
        })
        .await
    }

    async fn list_invites(&self, chest_id: &ChestId) -> Result<Vec<Invite>> {
        let chest_id = *chest_id;
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM invites WHERE chest_id = ?1 ORDER BY created_at, invite_id",
                INVITE_COLUMNS
            ))?;
            let invites = stmt
                .query_map(params![chest_id.as_bytes().as_slice()], row_to_invite)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(invites)
        })
        .await
    }

    async fn delete_invite(&self, id: &InviteId) -> Result<bool> {
        let id = *id;
        self.blocking(move |conn| {
            let changed = conn.execute(
                "DELETE FROM invites WHERE invite_id = ?1",
                params![id.as_bytes().as_slice()],
            )?;
            Ok(changed > 0)
        })
        .await
    }

    async fn consume_invite(&self, id: &InviteId, grant: &Permission) -> Result<ConsumeOutcome> {
        let id = *id;
        let grant = grant.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            let invite_exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM invites WHERE invite_id = ?1)",
                params![id.as_bytes().as_slice()],
                |row| row.get(0),
            )?;
            if !invite_exists {
                return Ok(ConsumeOutcome::InviteGone);
            }

            let permission_exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM permissions WHERE chest_id = ?1 AND user_id = ?2)",
                params![
                    grant.chest_id.as_bytes().as_slice(),
                    grant.user_id.as_bytes().as_slice(),
                ],
                |row| row.get(0),
            )?;
            if permission_exists {
                return Ok(ConsumeOutcome::PermissionExists);
            }

            tx.execute(
                "DELETE FROM invites WHERE invite_id = ?1",
                params![id.as_bytes().as_slice()],
            )?;
            tx.execute(
                "INSERT INTO permissions (chest_id, user_id, role, granted_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    grant.chest_id.as_bytes().as_slice(),
                    grant.user_id.as_bytes().as_slice(),
                    grant.role.to_u8(),
                    grant.granted_at,
                ],
            )?;

            tx.commit()?;
            Ok(ConsumeOutcome::Consumed)
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Item Operations
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_item(&self, item: &Item) -> Result<bool> {
        let item = item.clone();
        self.blocking(move |conn| {
            let body_cbor = encode_cbor(&item.body)?;
            let tags_cbor = encode_cbor(&item.tags)?;

            let tx = conn.transaction()?;

            let chest_exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM chests WHERE chest_id = ?1)",
                params![item.chest_id.as_bytes().as_slice()],
                |row| row.get(0),
            )?;
            if !chest_exists {
                return Ok(false);
            }

            tx.execute(
                "INSERT INTO items (
                    item_id, chest_id, created_by, body, tags, event_at, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    item.id.as_bytes().as_slice(),
                    item.chest_id.as_bytes().as_slice(),
                    item.created_by.as_bytes().as_slice(),
                    body_cbor,
                    tags_cbor,
                    item.event_at,
                    item.created_at,
                ],
            )?;

            tx.commit()?;
            Ok(true)
        })
        .await
    }

    async fn get_item(&self, id: &ItemId) -> Result<Option<Item>> {
        let id = *id;
        self.blocking(move |conn| {
            let item = conn
                .query_row(
                    &format!("SELECT {} FROM items WHERE item_id = ?1", ITEM_COLUMNS),
                    params![id.as_bytes().as_slice()],
                    row_to_item,
                )
                .optional()?;
            Ok(item)
        })
        .await
    }

    async fn list_items(&self, chest_id: &ChestId) -> Result<Vec<Item>> {
        let chest_id = *chest_id;
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {} FROM items WHERE chest_id = ?1 ORDER BY created_at, item_id",
                ITEM_COLUMNS
            ))?;
            let items = stmt
                .query_map(params![chest_id.as_bytes().as_slice()], row_to_item)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(items)
        })
        .await
    }

    async fn delete_item(&self, id: &ItemId) -> Result<bool> {
        let id = *id;
        self.blocking(move |conn| {
            let changed = conn.execute(
                "DELETE FROM items WHERE item_id = ?1",
                params![id.as_bytes().as_slice()],
            )?;
            Ok(changed > 0)
        })
        .await
    }
}
