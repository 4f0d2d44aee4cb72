//! Ledger entries, resolved content and the merged records built from them.

use fiidbak_api_types::ContentDocument;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::types::{Address, BadgeTier};

/// Ledger-authoritative part of a product or feedback item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRecord {
    pub id: u64,
    pub owner: Address,
    pub content_ref: String,
    pub created_at: OffsetDateTime,
    pub exists: bool,
}

impl EntityRecord {
    /// Tombstones and entries without a content handle are never displayed.
    pub fn is_displayable(&self) -> bool {
        self.exists && self.id != 0 && !self.content_ref.trim().is_empty()
    }
}

/// Vote counters and approval flag kept on the ledger for a feedback item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub positive: u64,
    pub negative: u64,
    pub total: u64,
    pub approved: bool,
}

/// Feedback entry as read from the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackEntry {
    pub entity: EntityRecord,
    pub product_id: u64,
    pub tally: VoteTally,
    pub author_tier: BadgeTier,
}

/// Anything carrying an [`EntityRecord`] can go through the merge pipeline.
pub trait LedgerEntry {
    fn entity(&self) -> &EntityRecord;
}

impl LedgerEntry for EntityRecord {
    fn entity(&self) -> &EntityRecord {
        self
    }
}

impl LedgerEntry for FeedbackEntry {
    fn entity(&self) -> &EntityRecord {
        &self.entity
    }
}

/// Best-effort payload fetched from the content store. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentPayload {
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
    pub category: Option<String>,
    pub website: Option<String>,
    pub tags: Option<Vec<String>>,
    pub feedback_count: Option<u64>,
}

impl ContentPayload {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl From<ContentDocument> for ContentPayload {
    fn from(doc: ContentDocument) -> Self {
        Self {
            name: doc.name,
            description: doc.description,
            image: doc.image,
            category: doc.category,
            website: doc.website,
            tags: doc.tags,
            feedback_count: doc.feedback_count,
        }
    }
}

/// Display-ready product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub id: u64,
    pub owner: Address,
    pub content_ref: String,
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,
    pub name: String,
    pub description: String,
    pub image: String,
    pub category: Option<String>,
    pub website: Option<String>,
    pub tags: Vec<String>,
    pub feedback_count: u64,
}

/// Display-ready feedback item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: u64,
    pub product_id: u64,
    pub author: Address,
    pub author_tier: BadgeTier,
    pub content_ref: String,
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,
    pub body: String,
    pub votes: VoteTally,
}

/// Fields a user supplies when listing a new product.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub image: Option<String>,
    pub category: Option<String>,
    pub website: Option<String>,
    pub tags: Vec<String>,
}
