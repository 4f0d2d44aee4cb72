//! Schema step between raw gateway JSON and ledger entries.
//!
//! Every raw entry is validated here; nothing downstream ever sees a
//! half-populated record. A failure names the entry index and the field.
//!
//! Tombstoned rows are the exception: the ledger returns them zeroed, so
//! their owner and timestamp fall back to placeholders instead of failing
//! the whole batch.

use fiidbak_api_types::{RawFeedback, RawProduct, WireUint};
use time::OffsetDateTime;

use super::entities::{EntityRecord, FeedbackEntry, VoteTally};
use super::error::DomainError;
use super::types::{Address, BadgeTier};

pub fn decode_products(raw: Vec<RawProduct>) -> Result<Vec<EntityRecord>, DomainError> {
    raw.into_iter()
        .enumerate()
        .map(|(index, entry)| decode_product(index, entry))
        .collect()
}

pub fn decode_feedback(raw: Vec<RawFeedback>) -> Result<Vec<FeedbackEntry>, DomainError> {
    raw.into_iter()
        .enumerate()
        .map(|(index, entry)| decode_feedback_entry(index, entry))
        .collect()
}

fn decode_product(index: usize, raw: RawProduct) -> Result<EntityRecord, DomainError> {
    let id = required_uint(index, "productId", raw.product_id.as_ref())?;
    let exists = raw
        .exists
        .ok_or_else(|| DomainError::decode(index, "exists", "is missing"))?;
    let tombstone = !exists || id == 0;

    Ok(EntityRecord {
        id,
        owner: owner_field(index, "owner", raw.owner.as_deref(), tombstone)?,
        content_ref: raw.ipfs_cid.unwrap_or_default().trim().to_string(),
        created_at: created_field(index, "createdAt", raw.created_at.as_ref(), tombstone)?,
        exists,
    })
}

fn decode_feedback_entry(index: usize, raw: RawFeedback) -> Result<FeedbackEntry, DomainError> {
    let id = required_uint(index, "feedbackId", raw.feedback_id.as_ref())?;
    let exists = raw.exists.unwrap_or(true);
    let tombstone = !exists || id == 0;

    let entity = EntityRecord {
        id,
        owner: owner_field(index, "feedbackBy", raw.feedback_by.as_deref(), tombstone)?,
        content_ref: raw.feedback_hash.unwrap_or_default().trim().to_string(),
        created_at: created_field(index, "timestamp", raw.timestamp.as_ref(), tombstone)?,
        exists,
    };

    let tally = VoteTally {
        positive: optional_uint(index, "positiveVotes", raw.positive_votes.as_ref())?,
        negative: optional_uint(index, "negativeVotes", raw.negative_votes.as_ref())?,
        total: optional_uint(index, "totalVotes", raw.total_votes.as_ref())?,
        approved: raw.approved.unwrap_or(false),
    };

    let product_id = if tombstone {
        optional_uint(index, "productId", raw.product_id.as_ref()).unwrap_or(0)
    } else {
        required_uint(index, "productId", raw.product_id.as_ref())?
    };

    Ok(FeedbackEntry {
        entity,
        product_id,
        tally,
        author_tier: BadgeTier::from_id(optional_uint(
            index,
            "authorTier",
            raw.author_tier.as_ref(),
        )?),
    })
}

fn owner_field(
    index: usize,
    field: &'static str,
    value: Option<&str>,
    tombstone: bool,
) -> Result<Address, DomainError> {
    match address(index, field, value) {
        Err(_) if tombstone => Ok(Address::zero()),
        other => other,
    }
}

fn created_field(
    index: usize,
    field: &'static str,
    value: Option<&WireUint>,
    tombstone: bool,
) -> Result<OffsetDateTime, DomainError> {
    match timestamp(index, field, value) {
        Err(_) if tombstone => Ok(OffsetDateTime::UNIX_EPOCH),
        other => other,
    }
}

fn required_uint(
    index: usize,
    field: &'static str,
    value: Option<&WireUint>,
) -> Result<u64, DomainError> {
    value
        .ok_or_else(|| DomainError::decode(index, field, "is missing"))?
        .to_u64()
        .map_err(|reason| DomainError::decode(index, field, reason))
}

fn optional_uint(
    index: usize,
    field: &'static str,
    value: Option<&WireUint>,
) -> Result<u64, DomainError> {
    match value {
        Some(value) => value
            .to_u64()
            .map_err(|reason| DomainError::decode(index, field, reason)),
        None => Ok(0),
    }
}

fn address(index: usize, field: &'static str, value: Option<&str>) -> Result<Address, DomainError> {
    let raw = value.ok_or_else(|| DomainError::decode(index, field, "is missing"))?;
    Address::parse(raw).map_err(|err| DomainError::decode(index, field, err.to_string()))
}

fn timestamp(
    index: usize,
    field: &'static str,
    value: Option<&WireUint>,
) -> Result<OffsetDateTime, DomainError> {
    let seconds = required_uint(index, field, value)?;
    let seconds = i64::try_from(seconds)
        .map_err(|_| DomainError::decode(index, field, "exceeds the supported range"))?;
    OffsetDateTime::from_unix_timestamp(seconds)
        .map_err(|err| DomainError::decode(index, field, err.to_string()))
}
