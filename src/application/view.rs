//! Filtered, sorted and paginated views over a cached collection.

use std::cmp::Ordering;
use std::num::NonZeroUsize;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::domain::entities::{FeedbackRecord, ProductRecord};
use crate::domain::types::Address;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ViewError {
    #[error("unknown sort key `{0}` (expected newest, oldest or most-reviewed)")]
    UnknownSort(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    #[default]
    Newest,
    Oldest,
    MostReviewed,
}

impl FromStr for SortKey {
    type Err = ViewError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "newest" => Ok(SortKey::Newest),
            "oldest" => Ok(SortKey::Oldest),
            "most-reviewed" | "mostreviews" | "most-reviews" => Ok(SortKey::MostReviewed),
            _ => Err(ViewError::UnknownSort(value.to_string())),
        }
    }
}

/// What a view needs to know about a record.
pub trait Listable {
    fn id(&self) -> u64;
    fn created_at(&self) -> OffsetDateTime;
    fn review_count(&self) -> u64;
    /// Owner of a product, author of a feedback item.
    fn contributor(&self) -> &Address;
    /// `needle` is already lowercased and non-empty.
    fn matches(&self, needle: &str) -> bool;
}

impl Listable for ProductRecord {
    fn id(&self) -> u64 {
        self.id
    }

    fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    fn review_count(&self) -> u64 {
        self.feedback_count
    }

    fn contributor(&self) -> &Address {
        &self.owner
    }

    fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle) || self.description.to_lowercase().contains(needle)
    }
}

impl Listable for FeedbackRecord {
    fn id(&self) -> u64 {
        self.id
    }

    fn created_at(&self) -> OffsetDateTime {
        self.created_at
    }

    fn review_count(&self) -> u64 {
        self.votes.total
    }

    fn contributor(&self) -> &Address {
        &self.author
    }

    fn matches(&self, needle: &str) -> bool {
        self.body.to_lowercase().contains(needle)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewQuery {
    pub search: String,
    /// Keep only records contributed by this address.
    pub by: Option<Address>,
    pub sort: SortKey,
    /// 1-based; out-of-range values clamp to the first page.
    pub page: usize,
    pub page_size: NonZeroUsize,
}

impl ViewQuery {
    pub fn new(page_size: NonZeroUsize) -> Self {
        Self {
            search: String::new(),
            by: None,
            sort: SortKey::default(),
            page: 1,
            page_size,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewPage<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub total_pages: usize,
    pub total_matches: usize,
}

/// Derive one page of `items` without reordering the input.
pub fn derive_view<T>(items: &[T], query: &ViewQuery) -> ViewPage<T>
where
    T: Listable + Clone,
{
    let needle = query.search.trim().to_lowercase();
    let mut matched: Vec<&T> = items
        .iter()
        .filter(|item| query.by.as_ref().is_none_or(|by| item.contributor() == by))
        .filter(|item| needle.is_empty() || item.matches(&needle))
        .collect();

    matched.sort_by(|a, b| compare(*a, *b, query.sort));

    let page_size = query.page_size.get();
    let total_matches = matched.len();
    let total_pages = total_matches.div_ceil(page_size).max(1);
    let page = if query.page == 0 || query.page > total_pages {
        1
    } else {
        query.page
    };

    let items = matched
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .cloned()
        .collect();

    ViewPage {
        items,
        page,
        total_pages,
        total_matches,
    }
}

fn compare<T: Listable>(a: &T, b: &T, sort: SortKey) -> Ordering {
    match sort {
        SortKey::Newest => b
            .created_at()
            .cmp(&a.created_at())
            .then_with(|| b.id().cmp(&a.id())),
        SortKey::Oldest => a
            .created_at()
            .cmp(&b.created_at())
            .then_with(|| a.id().cmp(&b.id())),
        SortKey::MostReviewed => b
            .review_count()
            .cmp(&a.review_count())
            .then_with(|| b.id().cmp(&a.id())),
    }
}
