//! Ledger traits describing the read and write adapters.

use std::num::NonZeroU32;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{EntityRecord, FeedbackEntry};
use crate::domain::error::DomainError;
use crate::domain::types::{Address, BadgeTier};

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger transport error: {0}")]
    Transport(String),
    #[error("ledger responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("ledger request timed out")]
    Timeout,
    #[error("ledger response is malformed: {0}")]
    Malformed(String),
    #[error("ledger returned invalid entries: {0}")]
    Decode(#[from] DomainError),
    #[error("ledger rejected the transaction: {0}")]
    Rejected(String),
}

impl LedgerError {
    pub fn transport(err: impl std::fmt::Display) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Bounded window into a ledger listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerRange {
    pub start: u64,
    pub count: NonZeroU32,
}

impl LedgerRange {
    pub fn new(start: u64, count: NonZeroU32) -> Self {
        Self { start, count }
    }
}

/// Receipt of an accepted ledger write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReceipt {
    pub tx_hash: String,
    pub entity_id: Option<u64>,
}

/// Read side of the ledger.
///
/// Implementations return entries in ledger order and never filter
/// tombstones; an empty listing is a valid answer, distinct from an error.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    async fn fetch_products(&self, range: LedgerRange) -> Result<Vec<EntityRecord>, LedgerError>;

    async fn fetch_feedback(
        &self,
        product_id: u64,
        range: LedgerRange,
    ) -> Result<Vec<FeedbackEntry>, LedgerError>;

    async fn user_tier(&self, address: &Address) -> Result<BadgeTier, LedgerError>;

    async fn has_voted(&self, feedback_id: u64, voter: &Address) -> Result<bool, LedgerError>;

    /// Tiers the address has earned but not yet claimed.
    async fn eligible_badges(&self, address: &Address) -> Result<Vec<BadgeTier>, LedgerError>;
}

/// Write side of the ledger. Signing happens behind the relayer.
#[async_trait]
pub trait LedgerWriter: Send + Sync {
    async fn submit_product(
        &self,
        owner: &Address,
        content_ref: &str,
    ) -> Result<WriteReceipt, LedgerError>;

    async fn submit_feedback(
        &self,
        author: &Address,
        product_id: u64,
        content_ref: &str,
    ) -> Result<WriteReceipt, LedgerError>;

    async fn cast_vote(
        &self,
        voter: &Address,
        feedback_id: u64,
        upvote: bool,
    ) -> Result<WriteReceipt, LedgerError>;

    async fn claim_badge(
        &self,
        claimer: &Address,
        tier: BadgeTier,
        content_ref: &str,
    ) -> Result<WriteReceipt, LedgerError>;
}
