//! Fan-out from ledger entries to merged records.

use futures::stream::{self, StreamExt};
use metrics::counter;
use tracing::debug;

use crate::domain::entities::{ContentPayload, LedgerEntry};

use super::content::ContentResolver;

const METRIC_TOMBSTONES_SKIPPED: &str = "fiidbak_tombstones_skipped_total";

/// Drop non-displayable entries, resolve the content of the rest concurrently
/// and merge each pair.
///
/// At most `concurrency` resolutions run at once (`content.max_concurrency`,
/// 16 by default). A larger collection resolves in waves, so a single slow
/// handle holds back the entries queued behind it until its timeout expires.
/// Output follows ledger order regardless of completion order, and nothing is
/// returned until every resolution has settled.
pub async fn assemble<E, R, F>(
    collection: &'static str,
    entries: Vec<E>,
    resolver: &ContentResolver,
    concurrency: usize,
    merge: F,
) -> Vec<R>
where
    E: LedgerEntry,
    F: Fn(&E, ContentPayload) -> R,
{
    let total = entries.len();
    let visible: Vec<E> = entries
        .into_iter()
        .filter(|entry| entry.entity().is_displayable())
        .collect();

    let skipped = total - visible.len();
    if skipped > 0 {
        counter!(METRIC_TOMBSTONES_SKIPPED, "collection" => collection).increment(skipped as u64);
        debug!(collection, skipped, "Skipped entries without displayable content");
    }

    let pending: Vec<_> = visible
        .iter()
        .map(|entry| resolver.resolve(&entry.entity().content_ref))
        .collect();
    let payloads: Vec<ContentPayload> = stream::iter(pending)
        .buffered(concurrency.max(1))
        .collect()
        .await;

    visible
        .iter()
        .zip(payloads)
        .map(|(entry, payload)| merge(entry, payload))
        .collect()
}
