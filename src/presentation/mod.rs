//! Terminal rendering of collection views and write receipts.

pub mod format;

use std::fmt::Write as _;

use serde::Serialize;
use time::OffsetDateTime;

use crate::application::catalog::CollectionView;
use crate::application::ledger::WriteReceipt;
use crate::cache::CacheStatus;
use crate::domain::entities::{FeedbackRecord, ProductRecord};
use crate::domain::types::{Address, BadgeTier};

use self::format::{format_address, format_date, format_relative_time, truncate_text, vote_percentage};

const DESCRIPTION_WIDTH: usize = 100;

pub fn render_json<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(value)
}

pub fn render_products(view: &CollectionView<ProductRecord>, now: OffsetDateTime) -> String {
    let mut out = String::new();
    push_status_line(&mut out, view.status, view.error.as_deref(), view.last_fetch, now);

    if view.page.items.is_empty() {
        let _ = writeln!(out, "No products found.");
    }
    for product in &view.page.items {
        let _ = writeln!(out, "#{} {}", product.id, product.name);
        if !product.description.is_empty() {
            let _ = writeln!(out, "    {}", truncate_text(&product.description, DESCRIPTION_WIDTH));
        }
        let mut meta = format!(
            "    by {} | {} | {} review{}",
            format_address(product.owner.as_str()),
            format_date(product.created_at),
            product.feedback_count,
            if product.feedback_count == 1 { "" } else { "s" }
        );
        if let Some(category) = &product.category {
            let _ = write!(meta, " | {category}");
        }
        if !product.tags.is_empty() {
            let _ = write!(meta, " | tags: {}", product.tags.join(", "));
        }
        let _ = writeln!(out, "{meta}");
    }

    push_page_footer(&mut out, view.page.page, view.page.total_pages, view.page.total_matches);
    out
}

pub fn render_feedback(
    product: Option<&ProductRecord>,
    view: &CollectionView<FeedbackRecord>,
    now: OffsetDateTime,
) -> String {
    let mut out = String::new();
    if let Some(product) = product {
        let _ = writeln!(out, "Feedback for #{} {}", product.id, product.name);
    }
    push_status_line(&mut out, view.status, view.error.as_deref(), view.last_fetch, now);

    if view.page.items.is_empty() {
        let _ = writeln!(out, "No feedback yet.");
    }
    for item in &view.page.items {
        let approved = if item.votes.approved { " [approved]" } else { "" };
        let _ = writeln!(
            out,
            "#{} {} ({}) {}{}",
            item.id,
            format_address(item.author.as_str()),
            item.author_tier,
            format_relative_time(item.created_at, now),
            approved
        );
        if !item.body.is_empty() {
            let _ = writeln!(out, "    {}", item.body);
        }
        let _ = writeln!(
            out,
            "    +{} / -{} ({}% positive of {})",
            item.votes.positive,
            item.votes.negative,
            vote_percentage(item.votes.positive, item.votes.total),
            item.votes.total
        );
    }

    push_page_footer(&mut out, view.page.page, view.page.total_pages, view.page.total_matches);
    out
}

pub fn render_receipt(action: &str, receipt: &WriteReceipt) -> String {
    match receipt.entity_id {
        Some(id) => format!("{action}: id {id}, transaction {}", receipt.tx_hash),
        None => format!("{action}: transaction {}", receipt.tx_hash),
    }
}

pub fn render_tier(address: &Address, tier: BadgeTier) -> String {
    let rights = if tier.can_vote() {
        format!("{}x vote weight", tier.vote_weight())
    } else {
        "no voting rights".to_string()
    };
    format!("{}: {} ({rights})", address, tier.name())
}

pub fn render_badges(address: &Address, tier: BadgeTier, eligible: &[BadgeTier]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", render_tier(address, tier));
    if eligible.is_empty() {
        let _ = writeln!(out, "No badges ready to claim.");
        return out;
    }
    let _ = writeln!(out, "Ready to claim:");
    for badge in eligible {
        let needed = badge.required_feedback().unwrap_or_default();
        let _ = writeln!(
            out,
            "  {} (tier {}, {needed} feedback submission{})",
            badge.name(),
            badge.id(),
            if needed == 1 { "" } else { "s" }
        );
    }
    out
}

fn push_status_line(
    out: &mut String,
    status: CacheStatus,
    error: Option<&str>,
    last_fetch: Option<OffsetDateTime>,
    now: OffsetDateTime,
) {
    if let Some(error) = error {
        let _ = writeln!(out, "! showing cached data; last refresh failed: {error}");
    }
    if status == CacheStatus::Loading {
        let _ = writeln!(out, "(refreshing)");
    }
    if let Some(at) = last_fetch {
        let _ = writeln!(out, "Updated {}", format_relative_time(at, now).to_lowercase());
    }
}

fn push_page_footer(out: &mut String, page: usize, total_pages: usize, total_matches: usize) {
    let _ = writeln!(out, "-- page {page} of {total_pages} ({total_matches} total)");
}
