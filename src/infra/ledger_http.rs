//! Ledger gateway client over HTTP/JSON.

use async_trait::async_trait;
use fiidbak_api_types::{
    CastVoteRequest, ClaimBadgeRequest, EligibleBadgesResponse, HasVotedResponse, RawFeedback,
    RawProduct, ReceiptResponse, SubmitFeedbackRequest, SubmitProductRequest, TierResponse,
};
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::application::ledger::{LedgerError, LedgerRange, LedgerReader, LedgerWriter, WriteReceipt};
use crate::config::LedgerSettings;
use crate::domain::decode::{decode_feedback, decode_products};
use crate::domain::entities::{EntityRecord, FeedbackEntry};
use crate::domain::types::{Address, BadgeTier};

use super::error::InfraError;
use super::user_agent;

#[derive(Clone, Debug)]
pub struct HttpLedger {
    client: Client,
    base: Url,
}

impl HttpLedger {
    pub fn new(settings: &LedgerSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(user_agent())
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| InfraError::http(err.to_string()))?;
        Ok(Self {
            client,
            base: settings.url.clone(),
        })
    }

    fn url(&self, path: &str) -> Result<Url, LedgerError> {
        self.base.join(path).map_err(LedgerError::transport)
    }

    fn range_url(&self, path: &str, range: LedgerRange) -> Result<Url, LedgerError> {
        let mut url = self.url(path)?;
        url.query_pairs_mut()
            .append_pair("count", &range.count.to_string())
            .append_pair("start", &range.start.to_string());
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, LedgerError> {
        debug!(target = "fiidbak::ledger", url = %url, "GET");
        let response = self.client.get(url).send().await.map_err(request_error)?;
        read_json(response, false).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        url: Url,
        body: &B,
    ) -> Result<T, LedgerError> {
        debug!(target = "fiidbak::ledger", url = %url, "POST");
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(request_error)?;
        read_json(response, true).await
    }

    async fn submit(&self, url: Url, body: &impl Serialize) -> Result<WriteReceipt, LedgerError> {
        let receipt: ReceiptResponse = self.post_json(url, body).await?;
        let entity_id = receipt
            .entity_id
            .map(|id| id.to_u64())
            .transpose()
            .map_err(LedgerError::Malformed)?;
        Ok(WriteReceipt {
            tx_hash: receipt.tx_hash,
            entity_id,
        })
    }
}

fn request_error(err: reqwest::Error) -> LedgerError {
    if err.is_timeout() {
        LedgerError::Timeout
    } else {
        LedgerError::transport(err)
    }
}

/// Successful bodies are decoded as `T`. Client errors on writes mean the
/// relayer refused the transaction.
async fn read_json<T: DeserializeOwned>(response: Response, write: bool) -> Result<T, LedgerError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(request_error)?;
    if !status.is_success() {
        let body = String::from_utf8_lossy(&bytes).into_owned();
        if write && status.is_client_error() && status != StatusCode::NOT_FOUND {
            return Err(LedgerError::Rejected(body));
        }
        return Err(LedgerError::Status {
            status: status.as_u16(),
            body,
        });
    }
    serde_json::from_slice(&bytes).map_err(|err| LedgerError::Malformed(err.to_string()))
}

#[async_trait]
impl LedgerReader for HttpLedger {
    async fn fetch_products(&self, range: LedgerRange) -> Result<Vec<EntityRecord>, LedgerError> {
        let url = self.range_url("products", range)?;
        let raw: Vec<RawProduct> = self.get_json(url).await?;
        Ok(decode_products(raw)?)
    }

    async fn fetch_feedback(
        &self,
        product_id: u64,
        range: LedgerRange,
    ) -> Result<Vec<FeedbackEntry>, LedgerError> {
        let url = self.range_url(&format!("products/{product_id}/feedback"), range)?;
        let raw: Vec<RawFeedback> = self.get_json(url).await?;
        Ok(decode_feedback(raw)?)
    }

    async fn user_tier(&self, address: &Address) -> Result<BadgeTier, LedgerError> {
        let url = self.url(&format!("users/{address}/tier"))?;
        let response: TierResponse = self.get_json(url).await?;
        let id = response.tier.to_u64().map_err(LedgerError::Malformed)?;
        Ok(BadgeTier::from_id(id))
    }

    async fn has_voted(&self, feedback_id: u64, voter: &Address) -> Result<bool, LedgerError> {
        let url = self.url(&format!("feedback/{feedback_id}/votes/{voter}"))?;
        let response: HasVotedResponse = self.get_json(url).await?;
        Ok(response.has_voted)
    }

    async fn eligible_badges(&self, address: &Address) -> Result<Vec<BadgeTier>, LedgerError> {
        let url = self.url(&format!("users/{address}/badges/eligible"))?;
        let response: EligibleBadgesResponse = self.get_json(url).await?;
        let mut tiers = Vec::with_capacity(response.tiers.len());
        for raw in &response.tiers {
            let id = raw.to_u64().map_err(LedgerError::Malformed)?;
            let tier = BadgeTier::from_id(id);
            if tier != BadgeTier::Newbie && !tiers.contains(&tier) {
                tiers.push(tier);
            }
        }
        tiers.sort();
        Ok(tiers)
    }
}

#[async_trait]
impl LedgerWriter for HttpLedger {
    async fn submit_product(
        &self,
        owner: &Address,
        content_ref: &str,
    ) -> Result<WriteReceipt, LedgerError> {
        let body = SubmitProductRequest {
            owner: owner.to_string(),
            ipfs_cid: content_ref.to_string(),
        };
        self.submit(self.url("products")?, &body).await
    }

    async fn submit_feedback(
        &self,
        author: &Address,
        product_id: u64,
        content_ref: &str,
    ) -> Result<WriteReceipt, LedgerError> {
        let body = SubmitFeedbackRequest {
            product_id,
            author: author.to_string(),
            content: content_ref.to_string(),
        };
        self.submit(self.url("feedback")?, &body).await
    }

    async fn cast_vote(
        &self,
        voter: &Address,
        feedback_id: u64,
        upvote: bool,
    ) -> Result<WriteReceipt, LedgerError> {
        let body = CastVoteRequest {
            voter: voter.to_string(),
            upvote,
        };
        self.submit(self.url(&format!("feedback/{feedback_id}/votes"))?, &body)
            .await
    }

    async fn claim_badge(
        &self,
        claimer: &Address,
        tier: BadgeTier,
        content_ref: &str,
    ) -> Result<WriteReceipt, LedgerError> {
        let body = ClaimBadgeRequest {
            tier: tier.id(),
            ipfs_cid: content_ref.to_string(),
        };
        self.submit(self.url(&format!("users/{claimer}/badges"))?, &body)
            .await
    }
}
