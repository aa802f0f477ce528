//! Item records: typed units of content inside a chest.
//!
//! Blob contents (images, files) live in external blob storage; the item
//! only carries an opaque [`BlobRef`]. Upload plumbing and preview
//! scraping are outside this workspace.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{ChestId, ItemId, UserId};

/// Reference to a blob held by the external blob-storage collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobRef(pub String);

impl BlobRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The type-specific content of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemBody {
    Note { text: String },
    Link { url: String, title: Option<String> },
    Todo { text: String, done: bool },
    Image { blob: BlobRef, caption: Option<String> },
    File { blob: BlobRef, filename: String },
}

impl ItemBody {
    /// The fieldless discriminant, for filtering and logging.
    pub fn kind(&self) -> ItemKind {
        match self {
            ItemBody::Note { .. } => ItemKind::Note,
            ItemBody::Link { .. } => ItemKind::Link,
            ItemBody::Todo { .. } => ItemKind::Todo,
            ItemBody::Image { .. } => ItemKind::Image,
            ItemBody::File { .. } => ItemKind::File,
        }
    }
}

/// Discriminant of [`ItemBody`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Note,
    Link,
    Todo,
    Image,
    File,
}

impl fmt::Display for ItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ItemKind::Note => "note",
            ItemKind::Link => "link",
            ItemKind::Todo => "todo",
            ItemKind::Image => "image",
            ItemKind::File => "file",
        };
        write!(f, "{}", s)
    }
}

/// A typed unit of content belonging to one chest.
///
/// Items never outlive their chest; the store's cascade delete removes
/// them with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub chest_id: ChestId,
    pub created_by: UserId,
    pub body: ItemBody,
    pub tags: Vec<String>,
    /// Optional user-facing date attached to the item (Unix ms).
    pub event_at: Option<i64>,
    /// Creation time (Unix ms).
    pub created_at: i64,
}

impl Item {
    /// Materialize a draft into a stored item with a fresh id.
    pub fn from_draft(chest_id: ChestId, created_by: UserId, draft: ItemDraft, now: i64) -> Self {
        Self {
            id: ItemId::random(),
            chest_id,
            created_by,
            body: draft.body,
            tags: draft.tags,
            event_at: draft.event_at,
            created_at: now,
        }
    }
}

/// Caller-supplied fields of a new item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    pub body: ItemBody,
    pub tags: Vec<String>,
    pub event_at: Option<i64>,
}

impl ItemDraft {
    /// A draft with no tags and no date.
    pub fn new(body: ItemBody) -> Self {
        Self {
            body,
            tags: Vec::new(),
            event_at: None,
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn at(mut self, event_at: i64) -> Self {
        self.event_at = Some(event_at);
        self
    }
}
