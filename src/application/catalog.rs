//! Read orchestration: ledger ranges, content fan-out, cache writes and views.

use std::future::Future;
use std::num::{NonZeroU32, NonZeroUsize};
use std::sync::Arc;
use std::time::Instant;

use metrics::histogram;
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::cache::{CacheRegistry, CacheSnapshot, CacheStatus, CollectionCache};
use crate::domain::entities::{FeedbackRecord, ProductRecord};
use crate::domain::types::{Address, BadgeTier};

use super::assemble::assemble;
use super::content::ContentResolver;
use super::error::AppError;
use super::ledger::{LedgerError, LedgerRange, LedgerReader};
use super::merge::{MergePolicy, merge_feedback, merge_product};
use super::view::{Listable, ViewPage, ViewQuery, derive_view};

const METRIC_LOAD_MS: &str = "fiidbak_collection_load_ms";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// Fetch only when the cached collection is stale.
    IfStale,
    /// Fetch regardless of staleness. Cached items stay visible meanwhile.
    Forced,
}

#[derive(Debug, Clone, Copy)]
pub struct CatalogLimits {
    pub batch_size: NonZeroU32,
    pub max_entities: NonZeroU32,
    pub concurrency: NonZeroUsize,
}

impl Default for CatalogLimits {
    fn default() -> Self {
        Self {
            batch_size: NonZeroU32::new(50).unwrap_or(NonZeroU32::MIN),
            max_entities: NonZeroU32::new(500).unwrap_or(NonZeroU32::MIN),
            concurrency: NonZeroUsize::new(16).unwrap_or(NonZeroUsize::MIN),
        }
    }
}

/// One page of a collection together with the cache state it was derived from.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionView<T> {
    #[serde(flatten)]
    pub page: ViewPage<T>,
    pub status: CacheStatus,
    pub error: Option<String>,
    #[serde(with = "time::serde::timestamp::option")]
    pub last_fetch: Option<OffsetDateTime>,
}

impl<T> CollectionView<T>
where
    T: Listable + Clone,
{
    fn derive(snapshot: &CacheSnapshot<T>, query: &ViewQuery) -> Self {
        Self {
            page: derive_view(&snapshot.items, query),
            status: snapshot.status,
            error: snapshot.error.clone(),
            last_fetch: snapshot.last_fetch,
        }
    }

    /// Fail when the last load errored and there is nothing cached to show.
    ///
    /// A failed refresh over previously loaded items only logs a warning.
    pub fn ensure_available(&self, collection: &'static str) -> Result<(), AppError> {
        let Some(error) = self.error.as_deref().filter(|_| self.status == CacheStatus::Error)
        else {
            return Ok(());
        };
        if self.last_fetch.is_none() {
            return Err(AppError::Unavailable {
                collection,
                reason: error.to_string(),
            });
        }
        warn!(
            target = "fiidbak::catalog",
            collection,
            error,
            "Showing cached data after a failed refresh"
        );
        Ok(())
    }
}

pub struct CatalogService {
    ledger: Arc<dyn LedgerReader>,
    resolver: Arc<ContentResolver>,
    caches: Arc<CacheRegistry>,
    policy: MergePolicy,
    limits: CatalogLimits,
}

impl CatalogService {
    pub fn new(
        ledger: Arc<dyn LedgerReader>,
        resolver: Arc<ContentResolver>,
        caches: Arc<CacheRegistry>,
        policy: MergePolicy,
        limits: CatalogLimits,
    ) -> Self {
        Self {
            ledger,
            resolver,
            caches,
            policy,
            limits,
        }
    }

    pub fn caches(&self) -> &Arc<CacheRegistry> {
        &self.caches
    }

    /// Bring the products collection up to date and return its snapshot.
    ///
    /// Ledger failures are recorded in the cache rather than returned.
    pub async fn load_products(&self, refresh: Refresh) -> Arc<CacheSnapshot<ProductRecord>> {
        let cache = self.caches.products();
        if !should_fetch(&cache, refresh) {
            return cache.snapshot();
        }

        let ticket = cache.begin_fetch();
        let started = Instant::now();
        match self
            .read_in_ranges(|range| self.ledger.fetch_products(range))
            .await
        {
            Ok(entries) => {
                let records = assemble(
                    "products",
                    entries,
                    &self.resolver,
                    self.limits.concurrency.get(),
                    |entity, payload| merge_product(entity, payload, &self.policy),
                )
                .await;
                record_load("products", started);
                cache.complete(ticket, records);
            }
            Err(err) => {
                warn!(
                    target = "fiidbak::catalog",
                    collection = "products",
                    error = %err,
                    "Ledger read failed"
                );
                cache.fail(ticket, err.to_string());
            }
        }
        cache.snapshot()
    }

    pub async fn load_feedback(
        &self,
        product_id: u64,
        refresh: Refresh,
    ) -> Arc<CacheSnapshot<FeedbackRecord>> {
        let cache = self.caches.feedback(product_id);
        if !should_fetch(&cache, refresh) {
            return cache.snapshot();
        }

        let ticket = cache.begin_fetch();
        let started = Instant::now();
        match self
            .read_in_ranges(|range| self.ledger.fetch_feedback(product_id, range))
            .await
        {
            Ok(entries) => {
                let records = assemble(
                    "feedback",
                    entries,
                    &self.resolver,
                    self.limits.concurrency.get(),
                    merge_feedback,
                )
                .await;
                record_load("feedback", started);
                cache.complete(ticket, records);
            }
            Err(err) => {
                warn!(
                    target = "fiidbak::catalog",
                    collection = "feedback",
                    product_id,
                    error = %err,
                    "Ledger read failed"
                );
                cache.fail(ticket, err.to_string());
            }
        }
        cache.snapshot()
    }

    pub async fn product(&self, id: u64) -> Option<ProductRecord> {
        self.load_products(Refresh::IfStale).await;
        self.caches.products().find(|product| product.id == id)
    }

    pub async fn product_view(
        &self,
        query: &ViewQuery,
        refresh: Refresh,
    ) -> CollectionView<ProductRecord> {
        let snapshot = self.load_products(refresh).await;
        CollectionView::derive(&snapshot, query)
    }

    pub async fn feedback_view(
        &self,
        product_id: u64,
        query: &ViewQuery,
        refresh: Refresh,
    ) -> CollectionView<FeedbackRecord> {
        let snapshot = self.load_feedback(product_id, refresh).await;
        CollectionView::derive(&snapshot, query)
    }

    pub async fn user_tier(&self, address: &Address) -> Result<BadgeTier, LedgerError> {
        self.ledger.user_tier(address).await
    }

    /// Current tier plus the tiers earned but not yet claimed.
    pub async fn badge_status(
        &self,
        address: &Address,
    ) -> Result<(BadgeTier, Vec<BadgeTier>), LedgerError> {
        let (tier, eligible) = tokio::try_join!(
            self.ledger.user_tier(address),
            self.ledger.eligible_badges(address)
        )?;
        Ok((tier, eligible))
    }

    /// Read consecutive ranges until a short range arrives or the entity
    /// ceiling is reached.
    async fn read_in_ranges<T, F, Fut>(&self, mut fetch: F) -> Result<Vec<T>, LedgerError>
    where
        F: FnMut(LedgerRange) -> Fut,
        Fut: Future<Output = Result<Vec<T>, LedgerError>>,
    {
        let ceiling = u64::from(self.limits.max_entities.get());
        let batch = u64::from(self.limits.batch_size.get());
        let mut entries = Vec::new();
        let mut start = 0_u64;

        while start < ceiling {
            let wanted = (ceiling - start).min(batch);
            let Some(count) = u32::try_from(wanted).ok().and_then(NonZeroU32::new) else {
                break;
            };
            let range = LedgerRange::new(start, count);
            let page = fetch(range).await?;
            let received = page.len() as u64;
            entries.extend(page);
            if received < wanted {
                break;
            }
            start += wanted;
        }

        info!(
            target = "fiidbak::catalog",
            entries = entries.len(),
            "Ledger ranges read"
        );
        Ok(entries)
    }
}

fn should_fetch<T>(cache: &CollectionCache<T>, refresh: Refresh) -> bool
where
    T: Clone + Send + Sync + 'static,
{
    match refresh {
        Refresh::Forced => true,
        Refresh::IfStale => cache.is_stale(),
    }
}

fn record_load(collection: &'static str, started: Instant) {
    histogram!(METRIC_LOAD_MS, "collection" => collection)
        .record(started.elapsed().as_secs_f64() * 1000.0);
}
