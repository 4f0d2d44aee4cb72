//! Write flows: upload content, submit to the ledger, invalidate caches.
//!
//! Failures are returned to the caller and never land in a cache error slot.

use std::sync::Arc;

use fiidbak_api_types::ContentDocument;
use thiserror::Error;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tracing::info;

use crate::cache::CacheRegistry;
use crate::domain::entities::ProductDraft;
use crate::domain::types::{Address, BadgeTier};

use super::content::{ContentError, ContentSink};
use super::ledger::{LedgerError, LedgerReader, LedgerWriter, WriteReceipt};
use super::merge::normalize_tags;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("{0}")]
    Validation(String),
    #[error("badge tier {tier} cannot vote; Wooden or higher is required")]
    InsufficientTier { tier: BadgeTier },
    #[error("feedback {feedback_id} already has a vote from this address")]
    AlreadyVoted { feedback_id: u64 },
    #[error("address is not eligible for the {tier} badge")]
    NotEligible { tier: BadgeTier },
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl SubmitError {
    fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

/// Image bytes to upload alongside a new product.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub struct SubmissionService {
    content: Arc<dyn ContentSink>,
    reader: Arc<dyn LedgerReader>,
    writer: Arc<dyn LedgerWriter>,
    caches: Arc<CacheRegistry>,
}

impl SubmissionService {
    pub fn new(
        content: Arc<dyn ContentSink>,
        reader: Arc<dyn LedgerReader>,
        writer: Arc<dyn LedgerWriter>,
        caches: Arc<CacheRegistry>,
    ) -> Self {
        Self {
            content,
            reader,
            writer,
            caches,
        }
    }

    pub async fn create_product(
        &self,
        owner: &Address,
        draft: ProductDraft,
        image: Option<ImageUpload>,
    ) -> Result<WriteReceipt, SubmitError> {
        let name = required(&draft.name, "name")?;
        let description = required(&draft.description, "description")?;
        if image.is_some() && optional(draft.image.as_deref()).is_some() {
            return Err(SubmitError::validation(
                "provide either an image URL or an image file, not both",
            ));
        }

        let image = match image {
            Some(upload) => {
                if upload.bytes.is_empty() {
                    return Err(SubmitError::validation("image file is empty"));
                }
                let cid = self.content.upload_file(&upload.file_name, upload.bytes).await?;
                Some(self.content.public_url(&cid)?.to_string())
            }
            None => optional(draft.image.as_deref()),
        };

        let tags = normalize_tags(draft.tags);
        let document = ContentDocument {
            name: Some(name),
            description: Some(description),
            image,
            category: optional(draft.category.as_deref()),
            website: optional(draft.website.as_deref()),
            tags: (!tags.is_empty()).then_some(tags),
            feedback_count: None,
            creator: Some(owner.to_string()),
            created_at: now_rfc3339(),
        };

        let content_ref = self.content.upload_json(&document).await?;
        let receipt = self.writer.submit_product(owner, &content_ref).await?;
        self.caches.products().mark_stale();

        info!(
            target = "fiidbak::submit",
            owner = %owner,
            content_ref = %content_ref,
            tx_hash = %receipt.tx_hash,
            "Product submitted"
        );
        Ok(receipt)
    }

    pub async fn submit_feedback(
        &self,
        author: &Address,
        product_id: u64,
        text: &str,
    ) -> Result<WriteReceipt, SubmitError> {
        if product_id == 0 {
            return Err(SubmitError::validation("product id must be positive"));
        }
        let body = required(text, "feedback text")?;

        let document = ContentDocument {
            description: Some(body),
            creator: Some(author.to_string()),
            created_at: now_rfc3339(),
            ..Default::default()
        };
        let content_ref = self.content.upload_json(&document).await?;
        let receipt = self
            .writer
            .submit_feedback(author, product_id, &content_ref)
            .await?;

        self.caches.feedback(product_id).mark_stale();
        self.caches.products().mark_stale();

        info!(
            target = "fiidbak::submit",
            author = %author,
            product_id,
            tx_hash = %receipt.tx_hash,
            "Feedback submitted"
        );
        Ok(receipt)
    }

    /// Cast a vote on a feedback item after checking the voter's badge tier.
    ///
    /// An address votes at most once per feedback item; a repeat is refused
    /// before anything is written.
    pub async fn cast_vote(
        &self,
        voter: &Address,
        product_id: u64,
        feedback_id: u64,
        upvote: bool,
    ) -> Result<WriteReceipt, SubmitError> {
        if feedback_id == 0 {
            return Err(SubmitError::validation("feedback id must be positive"));
        }

        let tier = self.reader.user_tier(voter).await?;
        if !tier.can_vote() {
            return Err(SubmitError::InsufficientTier { tier });
        }
        if self.reader.has_voted(feedback_id, voter).await? {
            return Err(SubmitError::AlreadyVoted { feedback_id });
        }

        let receipt = self.writer.cast_vote(voter, feedback_id, upvote).await?;
        self.caches.mark_feedback_stale(product_id);

        info!(
            target = "fiidbak::submit",
            voter = %voter,
            feedback_id,
            upvote,
            weight = tier.vote_weight(),
            tx_hash = %receipt.tx_hash,
            "Vote cast"
        );
        Ok(receipt)
    }

    /// Pin badge metadata and claim an earned tier for `claimer`.
    pub async fn claim_badge(
        &self,
        claimer: &Address,
        tier: BadgeTier,
    ) -> Result<WriteReceipt, SubmitError> {
        let Some(required_feedback) = tier.required_feedback() else {
            return Err(SubmitError::validation(format!("the {tier} tier cannot be claimed")));
        };
        let eligible = self.reader.eligible_badges(claimer).await?;
        if !eligible.contains(&tier) {
            return Err(SubmitError::NotEligible { tier });
        }

        let document = ContentDocument {
            name: Some(format!("{tier} badge")),
            description: Some(format!(
                "Awarded for {required_feedback} feedback submission{}",
                if required_feedback == 1 { "" } else { "s" }
            )),
            creator: Some(claimer.to_string()),
            created_at: now_rfc3339(),
            ..Default::default()
        };
        let content_ref = self.content.upload_json(&document).await?;
        let receipt = self.writer.claim_badge(claimer, tier, &content_ref).await?;

        info!(
            target = "fiidbak::submit",
            claimer = %claimer,
            tier = %tier,
            content_ref = %content_ref,
            tx_hash = %receipt.tx_hash,
            "Badge claimed"
        );
        Ok(receipt)
    }
}

fn required(value: &str, field: &str) -> Result<String, SubmitError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SubmitError::validation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

fn now_rfc3339() -> Option<String> {
    OffsetDateTime::now_utc().format(&Rfc3339).ok()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use url::Url;

    use super::*;
    use crate::application::ledger::LedgerRange;
    use crate::domain::entities::{EntityRecord, FeedbackEntry};

    const OWNER: &str = "0x6666666666666666666666666666666666666666";

    fn owner() -> Address {
        Address::parse(OWNER).expect("address")
    }

    #[derive(Default)]
    struct RecordingSink {
        documents: Mutex<Vec<ContentDocument>>,
        files: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ContentSink for RecordingSink {
        async fn upload_json(&self, document: &ContentDocument) -> Result<String, ContentError> {
            let mut documents = self.documents.lock().unwrap();
            documents.push(document.clone());
            Ok(format!("bafyjson{}", documents.len()))
        }

        async fn upload_file(&self, file_name: &str, _bytes: Vec<u8>) -> Result<String, ContentError> {
            self.files.lock().unwrap().push(file_name.to_string());
            Ok("bafyimage".into())
        }

        fn public_url(&self, content_ref: &str) -> Result<Url, ContentError> {
            Url::parse(&format!("https://ipfs.io/ipfs/{content_ref}"))
                .map_err(|err| ContentError::InvalidRef(err.to_string()))
        }
    }

    struct FixedTierLedger {
        tier: BadgeTier,
        writes: Mutex<Vec<String>>,
        reject: bool,
        voted: Vec<u64>,
        eligible: Vec<BadgeTier>,
    }

    impl FixedTierLedger {
        fn new(tier: BadgeTier) -> Self {
            Self {
                tier,
                writes: Mutex::new(Vec::new()),
                reject: false,
                voted: Vec::new(),
                eligible: Vec::new(),
            }
        }

        fn record(&self, entry: String) -> Result<WriteReceipt, LedgerError> {
            if self.reject {
                return Err(LedgerError::Rejected("execution reverted".into()));
            }
            self.writes.lock().unwrap().push(entry);
            Ok(WriteReceipt {
                tx_hash: "0xfeed".into(),
                entity_id: Some(1),
            })
        }
    }

    #[async_trait]
    impl LedgerReader for FixedTierLedger {
        async fn fetch_products(&self, _range: LedgerRange) -> Result<Vec<EntityRecord>, LedgerError> {
            Ok(Vec::new())
        }

        async fn fetch_feedback(
            &self,
            _product_id: u64,
            _range: LedgerRange,
        ) -> Result<Vec<FeedbackEntry>, LedgerError> {
            Ok(Vec::new())
        }

        async fn user_tier(&self, _address: &Address) -> Result<BadgeTier, LedgerError> {
            Ok(self.tier)
        }

        async fn has_voted(&self, feedback_id: u64, _voter: &Address) -> Result<bool, LedgerError> {
            Ok(self.voted.contains(&feedback_id))
        }

        async fn eligible_badges(&self, _address: &Address) -> Result<Vec<BadgeTier>, LedgerError> {
            Ok(self.eligible.clone())
        }
    }

    #[async_trait]
    impl LedgerWriter for FixedTierLedger {
        async fn submit_product(&self, owner: &Address, content_ref: &str) -> Result<WriteReceipt, LedgerError> {
            self.record(format!("product:{owner}:{content_ref}"))
        }

        async fn submit_feedback(
            &self,
            author: &Address,
            product_id: u64,
            content_ref: &str,
        ) -> Result<WriteReceipt, LedgerError> {
            self.record(format!("feedback:{author}:{product_id}:{content_ref}"))
        }

        async fn cast_vote(&self, voter: &Address, feedback_id: u64, upvote: bool) -> Result<WriteReceipt, LedgerError> {
            self.record(format!("vote:{voter}:{feedback_id}:{upvote}"))
        }

        async fn claim_badge(
            &self,
            claimer: &Address,
            tier: BadgeTier,
            content_ref: &str,
        ) -> Result<WriteReceipt, LedgerError> {
            self.record(format!("badge:{claimer}:{}:{content_ref}", tier.id()))
        }
    }

    struct Harness {
        sink: Arc<RecordingSink>,
        ledger: Arc<FixedTierLedger>,
        caches: Arc<CacheRegistry>,
        service: SubmissionService,
    }

    fn harness(ledger: FixedTierLedger) -> Harness {
        let sink = Arc::new(RecordingSink::default());
        let ledger = Arc::new(ledger);
        let caches = Arc::new(CacheRegistry::default());
        let service = SubmissionService::new(sink.clone(), ledger.clone(), ledger.clone(), caches.clone());
        Harness {
            sink,
            ledger,
            caches,
            service,
        }
    }

    fn draft() -> ProductDraft {
        ProductDraft {
            name: " Widget ".into(),
            description: "Does things".into(),
            tags: vec!["tools".into(), " tools ".into(), "".into(), "diy".into()],
            ..Default::default()
        }
    }

    fn fill_products(caches: &CacheRegistry) {
        let products = caches.products();
        let ticket = products.begin_fetch();
        products.complete(ticket, Vec::new());
    }

    #[tokio::test]
    async fn create_product_uploads_document_and_marks_products_stale() {
        let h = harness(FixedTierLedger::new(BadgeTier::Newbie));
        fill_products(&h.caches);
        assert!(!h.caches.products().is_stale());

        let receipt = h.service.create_product(&owner(), draft(), None).await.expect("created");
        assert_eq!(receipt.tx_hash, "0xfeed");

        let documents = h.sink.documents.lock().unwrap();
        let document = &documents[0];
        assert_eq!(document.name.as_deref(), Some("Widget"));
        assert_eq!(document.tags, Some(vec!["tools".to_string(), "diy".to_string()]));
        assert_eq!(document.creator.as_deref(), Some(OWNER));
        assert!(document.image.is_none());
        assert_eq!(
            *h.ledger.writes.lock().unwrap(),
            vec![format!("product:{OWNER}:bafyjson1")]
        );
        assert!(h.caches.products().is_stale());
    }

    #[tokio::test]
    async fn create_product_uploads_image_file_first() {
        let h = harness(FixedTierLedger::new(BadgeTier::Newbie));
        let upload = ImageUpload {
            file_name: "widget.png".into(),
            bytes: vec![1, 2, 3],
        };
        h.service
            .create_product(&owner(), draft(), Some(upload))
            .await
            .expect("created");

        assert_eq!(*h.sink.files.lock().unwrap(), vec!["widget.png".to_string()]);
        let documents = h.sink.documents.lock().unwrap();
        assert_eq!(documents[0].image.as_deref(), Some("https://ipfs.io/ipfs/bafyimage"));
    }

    #[tokio::test]
    async fn create_product_requires_name_and_description() {
        let h = harness(FixedTierLedger::new(BadgeTier::Newbie));
        let err = h
            .service
            .create_product(
                &owner(),
                ProductDraft {
                    description: "  ".into(),
                    ..draft()
                },
                None,
            )
            .await
            .expect_err("missing description");
        assert!(matches!(err, SubmitError::Validation(ref msg) if msg.contains("description")));
        assert!(h.sink.documents.lock().unwrap().is_empty());
        assert!(h.ledger.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn ledger_rejection_is_returned_and_cache_untouched() {
        let mut ledger = FixedTierLedger::new(BadgeTier::Newbie);
        ledger.reject = true;
        let h = harness(ledger);
        fill_products(&h.caches);

        let err = h
            .service
            .create_product(&owner(), draft(), None)
            .await
            .expect_err("rejected");
        assert!(matches!(err, SubmitError::Ledger(LedgerError::Rejected(_))));
        let products = h.caches.products();
        assert!(!products.is_stale());
        assert!(products.snapshot().error.is_none());
    }

    #[tokio::test]
    async fn feedback_marks_feedback_and_products_stale() {
        let h = harness(FixedTierLedger::new(BadgeTier::Newbie));
        fill_products(&h.caches);
        let feedback = h.caches.feedback(3);
        let ticket = feedback.begin_fetch();
        feedback.complete(ticket, Vec::new());

        h.service
            .submit_feedback(&owner(), 3, "  Works great  ")
            .await
            .expect("submitted");

        let documents = h.sink.documents.lock().unwrap();
        assert_eq!(documents[0].description.as_deref(), Some("Works great"));
        assert!(feedback.is_stale());
        assert!(h.caches.products().is_stale());
    }

    #[tokio::test]
    async fn empty_feedback_is_rejected() {
        let h = harness(FixedTierLedger::new(BadgeTier::Newbie));
        let err = h
            .service
            .submit_feedback(&owner(), 3, "   ")
            .await
            .expect_err("empty");
        assert!(matches!(err, SubmitError::Validation(_)));
    }

    #[tokio::test]
    async fn voting_requires_wooden_tier() {
        let h = harness(FixedTierLedger::new(BadgeTier::Seedling));
        let err = h
            .service
            .cast_vote(&owner(), 1, 7, true)
            .await
            .expect_err("tier too low");
        assert!(matches!(
            err,
            SubmitError::InsufficientTier {
                tier: BadgeTier::Seedling
            }
        ));
        assert!(h.ledger.writes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn eligible_vote_is_submitted() {
        let h = harness(FixedTierLedger::new(BadgeTier::Gold));
        h.service
            .cast_vote(&owner(), 1, 7, false)
            .await
            .expect("voted");
        assert_eq!(
            *h.ledger.writes.lock().unwrap(),
            vec![format!("vote:{OWNER}:7:false")]
        );
    }

    #[tokio::test]
    async fn second_vote_on_same_feedback_is_refused() {
        let mut ledger = FixedTierLedger::new(BadgeTier::Bronze);
        ledger.voted = vec![7];
        let h = harness(ledger);
        let feedback = h.caches.feedback(1);
        let ticket = feedback.begin_fetch();
        feedback.complete(ticket, Vec::new());

        let err = h
            .service
            .cast_vote(&owner(), 1, 7, true)
            .await
            .expect_err("already voted");
        assert!(matches!(err, SubmitError::AlreadyVoted { feedback_id: 7 }));
        assert!(h.ledger.writes.lock().unwrap().is_empty());
        assert!(!feedback.is_stale());

        h.service
            .cast_vote(&owner(), 1, 8, true)
            .await
            .expect("other feedback");
    }

    #[tokio::test]
    async fn eligible_badge_is_claimed_with_metadata() {
        let mut ledger = FixedTierLedger::new(BadgeTier::Seedling);
        ledger.eligible = vec![BadgeTier::Wooden];
        let h = harness(ledger);

        let receipt = h
            .service
            .claim_badge(&owner(), BadgeTier::Wooden)
            .await
            .expect("claimed");
        assert_eq!(receipt.tx_hash, "0xfeed");

        let documents = h.sink.documents.lock().unwrap();
        assert_eq!(documents[0].name.as_deref(), Some("Wooden badge"));
        assert_eq!(
            documents[0].description.as_deref(),
            Some("Awarded for 5 feedback submissions")
        );
        assert_eq!(
            *h.ledger.writes.lock().unwrap(),
            vec![format!("badge:{OWNER}:2:bafyjson1")]
        );
    }

    #[tokio::test]
    async fn badge_claim_requires_eligibility() {
        let mut ledger = FixedTierLedger::new(BadgeTier::Seedling);
        ledger.eligible = vec![BadgeTier::Wooden];
        let h = harness(ledger);

        let err = h
            .service
            .claim_badge(&owner(), BadgeTier::Gold)
            .await
            .expect_err("not earned");
        assert!(matches!(err, SubmitError::NotEligible { tier: BadgeTier::Gold }));

        let err = h
            .service
            .claim_badge(&owner(), BadgeTier::Newbie)
            .await
            .expect_err("starting tier");
        assert!(matches!(err, SubmitError::Validation(_)));
        assert!(h.sink.documents.lock().unwrap().is_empty());
        assert!(h.ledger.writes.lock().unwrap().is_empty());
    }
}
