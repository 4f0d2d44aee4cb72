//! Process-wide owner of every collection cache.

use std::sync::Arc;

use dashmap::DashMap;

use crate::domain::entities::{FeedbackRecord, ProductRecord};

use super::config::CacheConfig;
use super::store::CollectionCache;

/// Holds the products collection and one feedback collection per product,
/// created on first use.
pub struct CacheRegistry {
    config: CacheConfig,
    products: Arc<CollectionCache<ProductRecord>>,
    feedback: DashMap<u64, Arc<CollectionCache<FeedbackRecord>>>,
}

impl CacheRegistry {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            products: Arc::new(CollectionCache::new("products", config.stale_after)),
            feedback: DashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn products(&self) -> Arc<CollectionCache<ProductRecord>> {
        Arc::clone(&self.products)
    }

    pub fn feedback(&self, product_id: u64) -> Arc<CollectionCache<FeedbackRecord>> {
        let entry = self.feedback.entry(product_id).or_insert_with(|| {
            Arc::new(CollectionCache::new(
                format!("feedback:{product_id}"),
                self.config.stale_after,
            ))
        });
        Arc::clone(entry.value())
    }

    /// Mark a product's feedback collection stale if it has been created.
    pub fn mark_feedback_stale(&self, product_id: u64) {
        if let Some(cache) = self.feedback.get(&product_id) {
            cache.mark_stale();
        }
    }

    pub fn reset_all(&self) {
        self.products.reset();
        for entry in self.feedback.iter() {
            entry.value().reset();
        }
    }
}

impl Default for CacheRegistry {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheStatus;

    #[test]
    fn feedback_caches_are_created_once_per_product() {
        let registry = CacheRegistry::default();
        let first = registry.feedback(7);
        let again = registry.feedback(7);
        let other = registry.feedback(8);

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(first.label(), "feedback:7");
    }

    #[test]
    fn reset_all_empties_every_collection() {
        let registry = CacheRegistry::default();
        let products = registry.products();
        let ticket = products.begin_fetch();
        products.complete(ticket, Vec::new());
        let feedback = registry.feedback(1);
        let ticket = feedback.begin_fetch();
        feedback.complete(ticket, Vec::new());

        registry.reset_all();
        assert_eq!(products.snapshot().status, CacheStatus::Empty);
        assert_eq!(feedback.snapshot().status, CacheStatus::Empty);
    }

    #[test]
    fn marking_unknown_feedback_collection_is_a_no_op() {
        let registry = CacheRegistry::default();
        registry.mark_feedback_stale(99);
        let cache = registry.feedback(99);
        let ticket = cache.begin_fetch();
        cache.complete(ticket, Vec::new());
        registry.mark_feedback_stale(99);
        assert!(cache.is_stale());
    }
}
