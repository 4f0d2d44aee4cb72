//! Wire-level request and response shapes for the Fiidbak ledger gateway and
//! the content store.
//!
//! These types mirror the JSON exactly as it travels; they carry no
//! validation. Clients decode them into their own domain types.

use serde::{Deserialize, Serialize};

/// Unsigned integer as emitted by the gateway.
///
/// Contract `uint256` values arrive either as JSON numbers or, when they do
/// not fit a double, as decimal strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireUint {
    Number(u64),
    Text(String),
}

impl WireUint {
    /// Interpret the value as `u64`, returning a description of the failure.
    pub fn to_u64(&self) -> Result<u64, String> {
        match self {
            WireUint::Number(value) => Ok(*value),
            WireUint::Text(text) => text
                .trim()
                .parse::<u64>()
                .map_err(|err| format!("`{text}` is not an unsigned integer: {err}")),
        }
    }
}

impl From<u64> for WireUint {
    fn from(value: u64) -> Self {
        WireUint::Number(value)
    }
}

/// Product entry as returned by `GET /products`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProduct {
    pub product_id: Option<WireUint>,
    pub owner: Option<String>,
    pub ipfs_cid: Option<String>,
    pub created_at: Option<WireUint>,
    pub exists: Option<bool>,
}

/// Feedback entry as returned by `GET /products/{id}/feedback`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFeedback {
    pub feedback_id: Option<WireUint>,
    pub product_id: Option<WireUint>,
    pub feedback_by: Option<String>,
    pub feedback_hash: Option<String>,
    pub timestamp: Option<WireUint>,
    #[serde(default)]
    pub positive_votes: Option<WireUint>,
    #[serde(default)]
    pub negative_votes: Option<WireUint>,
    #[serde(default)]
    pub total_votes: Option<WireUint>,
    #[serde(default)]
    pub approved: Option<bool>,
    #[serde(default)]
    pub author_tier: Option<WireUint>,
    #[serde(default = "default_exists")]
    pub exists: Option<bool>,
}

fn default_exists() -> Option<bool> {
    Some(true)
}

/// Response of `GET /users/{address}/tier`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierResponse {
    pub tier: WireUint,
}

/// Response of `GET /feedback/{id}/votes/{voter}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HasVotedResponse {
    pub has_voted: bool,
}

/// Response of `GET /users/{address}/badges/eligible`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibleBadgesResponse {
    #[serde(default)]
    pub tiers: Vec<WireUint>,
}

/// Body of `POST /users/{address}/badges`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimBadgeRequest {
    pub tier: u8,
    pub ipfs_cid: String,
}

/// Body of `POST /products`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitProductRequest {
    pub owner: String,
    pub ipfs_cid: String,
}

/// Body of `POST /feedback`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFeedbackRequest {
    pub product_id: u64,
    pub author: String,
    pub content: String,
}

/// Body of `POST /feedback/{id}/votes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CastVoteRequest {
    pub voter: String,
    pub upvote: bool,
}

/// Transaction receipt returned by every ledger write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptResponse {
    pub tx_hash: String,
    #[serde(default)]
    pub entity_id: Option<WireUint>,
}

/// JSON document stored in the content store for products and feedback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Response of the pinning service after an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinResponse {
    #[serde(rename = "IpfsHash")]
    pub ipfs_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_uint_accepts_numbers_and_strings() {
        let values: Vec<WireUint> = serde_json::from_str(r#"[7, "42", " 9 "]"#).expect("parse");
        let parsed: Vec<u64> = values
            .iter()
            .map(|value| value.to_u64().expect("valid"))
            .collect();
        assert_eq!(parsed, vec![7, 42, 9]);
    }

    #[test]
    fn wire_uint_rejects_non_numeric_text() {
        let value = WireUint::Text("0x1f".into());
        assert!(value.to_u64().is_err());
    }

    #[test]
    fn raw_product_uses_camel_case_fields() {
        let raw: RawProduct = serde_json::from_str(
            r#"{"productId":"3","owner":"0xabc","ipfsCid":"bafy","createdAt":1700000000,"exists":true}"#,
        )
        .expect("parse");
        assert_eq!(raw.product_id, Some(WireUint::Text("3".into())));
        assert_eq!(raw.ipfs_cid.as_deref(), Some("bafy"));
        assert_eq!(raw.exists, Some(true));
    }

    #[test]
    fn raw_feedback_defaults_missing_exists_to_true() {
        let raw: RawFeedback = serde_json::from_str(
            r#"{"feedbackId":1,"productId":2,"feedbackBy":"0xabc","feedbackHash":"cid","timestamp":5}"#,
        )
        .expect("parse");
        assert_eq!(raw.exists, Some(true));
        assert!(raw.positive_votes.is_none());
    }

    #[test]
    fn eligible_badges_accept_mixed_ids() {
        let response: EligibleBadgesResponse =
            serde_json::from_str(r#"{"tiers":[1,"2"]}"#).expect("parse");
        assert_eq!(response.tiers, vec![WireUint::Number(1), WireUint::Text("2".into())]);

        let empty: EligibleBadgesResponse = serde_json::from_str("{}").expect("parse");
        assert!(empty.tiers.is_empty());
    }

    #[test]
    fn content_document_ignores_unknown_fields() {
        let doc: ContentDocument =
            serde_json::from_str(r#"{"name":"Widget","extra":1,"feedbackCount":4}"#).expect("parse");
        assert_eq!(doc.name.as_deref(), Some("Widget"));
        assert_eq!(doc.feedback_count, Some(4));
        assert!(doc.tags.is_none());
    }
}
