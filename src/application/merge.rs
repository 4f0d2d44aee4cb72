//! Pure combination of ledger entries with resolved content.

use crate::domain::entities::{ContentPayload, EntityRecord, FeedbackEntry, FeedbackRecord, ProductRecord};

pub const DEFAULT_UNNAMED_LABEL: &str = "Unnamed";
pub const DEFAULT_PLACEHOLDER_IMAGE: &str = "/placeholder-product.jpg";

/// Fallbacks applied to fields the content store did not provide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePolicy {
    pub unnamed_label: String,
    pub placeholder_image: String,
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self {
            unnamed_label: DEFAULT_UNNAMED_LABEL.to_string(),
            placeholder_image: DEFAULT_PLACEHOLDER_IMAGE.to_string(),
        }
    }
}

impl From<&crate::config::DisplaySettings> for MergePolicy {
    fn from(settings: &crate::config::DisplaySettings) -> Self {
        Self {
            unnamed_label: settings.unnamed_label.clone(),
            placeholder_image: settings.placeholder_image.clone(),
        }
    }
}

/// Identity, owner and timestamp always come from the ledger entry; the rest
/// comes from `content` with fallbacks.
pub fn merge_product(entity: &EntityRecord, content: ContentPayload, policy: &MergePolicy) -> ProductRecord {
    ProductRecord {
        id: entity.id,
        owner: entity.owner.clone(),
        content_ref: entity.content_ref.clone(),
        created_at: entity.created_at,
        name: present(content.name).unwrap_or_else(|| policy.unnamed_label.clone()),
        description: present(content.description).unwrap_or_default(),
        image: present(content.image).unwrap_or_else(|| policy.placeholder_image.clone()),
        category: present(content.category),
        website: present(content.website),
        tags: normalize_tags(content.tags.unwrap_or_default()),
        feedback_count: content.feedback_count.unwrap_or(0),
    }
}

pub fn merge_feedback(entry: &FeedbackEntry, content: ContentPayload) -> FeedbackRecord {
    FeedbackRecord {
        id: entry.entity.id,
        product_id: entry.product_id,
        author: entry.entity.owner.clone(),
        author_tier: entry.author_tier,
        content_ref: entry.entity.content_ref.clone(),
        created_at: entry.entity.created_at,
        body: present(content.description).unwrap_or_default(),
        votes: entry.tally,
    }
}

/// Trim tags, dropping blanks and repeats while keeping first occurrence order.
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim();
        if !tag.is_empty() && !out.iter().any(|seen| seen == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}
