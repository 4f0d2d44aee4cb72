//! Collection cache with explicit fetch tickets.
//!
//! One [`CollectionCache`] holds the last merged collection of a kind
//! (all products, or the feedback of one product). Loading never clears
//! visible items; only the holder of the newest ticket may write.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use metrics::counter;
use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::watch;
use tracing::{debug, info};
use uuid::Uuid;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";
const METRIC_FETCH_DISCARDED: &str = "fiidbak_cache_fetch_discarded_total";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStatus {
    Empty,
    Loading,
    Ready,
    Error,
}

/// Immutable view of a collection at one point in time.
#[derive(Debug, Clone)]
pub struct CacheSnapshot<T> {
    pub status: CacheStatus,
    pub items: Arc<Vec<T>>,
    pub error: Option<String>,
    pub last_fetch: Option<OffsetDateTime>,
}

impl<T> CacheSnapshot<T> {
    fn empty() -> Self {
        Self {
            status: CacheStatus::Empty,
            items: Arc::new(Vec::new()),
            error: None,
            last_fetch: None,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == CacheStatus::Loading
    }
}

/// Proof of the right to write one fetch result.
///
/// Issued by [`CollectionCache::begin_fetch`]; a ticket superseded by a
/// newer one is rejected on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    generation: u64,
    id: Uuid,
}

impl FetchTicket {
    pub fn id(&self) -> Uuid {
        self.id
    }
}

struct State<T> {
    snapshot: Arc<CacheSnapshot<T>>,
    generation: u64,
    in_flight: Option<u64>,
    marked_stale: bool,
}

pub struct CollectionCache<T> {
    label: String,
    stale_after: Duration,
    state: RwLock<State<T>>,
    updates: watch::Sender<Arc<CacheSnapshot<T>>>,
}

impl<T> CollectionCache<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(label: impl Into<String>, stale_after: Duration) -> Self {
        let snapshot = Arc::new(CacheSnapshot::empty());
        Self {
            label: label.into(),
            stale_after,
            state: RwLock::new(State {
                snapshot: Arc::clone(&snapshot),
                generation: 0,
                in_flight: None,
                marked_stale: false,
            }),
            updates: watch::Sender::new(snapshot),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn snapshot(&self) -> Arc<CacheSnapshot<T>> {
        Arc::clone(&rw_read(&self.state, SOURCE, "snapshot").snapshot)
    }

    /// Receive every published snapshot, starting with the current one.
    pub fn subscribe(&self) -> watch::Receiver<Arc<CacheSnapshot<T>>> {
        self.updates.subscribe()
    }

    pub fn is_stale(&self) -> bool {
        self.is_stale_at(OffsetDateTime::now_utc())
    }

    /// Stale when never fetched, explicitly marked, or older than the window.
    pub fn is_stale_at(&self, now: OffsetDateTime) -> bool {
        let state = rw_read(&self.state, SOURCE, "is_stale");
        if state.marked_stale {
            return true;
        }
        match state.snapshot.last_fetch {
            None => true,
            Some(last_fetch) => {
                (now - last_fetch).whole_milliseconds() > self.stale_after.as_millis() as i128
            }
        }
    }

    pub fn is_marked_stale(&self) -> bool {
        rw_read(&self.state, SOURCE, "is_marked_stale").marked_stale
    }

    /// Start a fetch, superseding any fetch still in flight.
    pub fn begin_fetch(&self) -> FetchTicket {
        let mut state = rw_write(&self.state, SOURCE, "begin_fetch");
        state.generation += 1;
        state.in_flight = Some(state.generation);

        let previous = &state.snapshot;
        let snapshot = Arc::new(CacheSnapshot {
            status: CacheStatus::Loading,
            items: Arc::clone(&previous.items),
            error: None,
            last_fetch: previous.last_fetch,
        });
        state.snapshot = Arc::clone(&snapshot);
        let ticket = FetchTicket {
            generation: state.generation,
            id: Uuid::new_v4(),
        };
        drop(state);

        debug!(
            target = "fiidbak::cache",
            cache = %self.label,
            fetch_id = %ticket.id,
            generation = ticket.generation,
            "Fetch started"
        );
        self.updates.send_replace(snapshot);
        ticket
    }

    /// Install a successful fetch result. Returns `false` when the ticket was
    /// superseded and the result discarded.
    pub fn complete(&self, ticket: FetchTicket, items: Vec<T>) -> bool {
        self.complete_at(ticket, items, OffsetDateTime::now_utc())
    }

    pub fn complete_at(&self, ticket: FetchTicket, items: Vec<T>, fetched_at: OffsetDateTime) -> bool {
        let mut state = rw_write(&self.state, SOURCE, "complete");
        if state.in_flight != Some(ticket.generation) {
            drop(state);
            self.record_discard(ticket, "complete");
            return false;
        }

        let count = items.len();
        let snapshot = Arc::new(CacheSnapshot {
            status: CacheStatus::Ready,
            items: Arc::new(items),
            error: None,
            last_fetch: Some(fetched_at),
        });
        state.snapshot = Arc::clone(&snapshot);
        state.in_flight = None;
        state.marked_stale = false;
        drop(state);

        info!(
            target = "fiidbak::cache",
            cache = %self.label,
            fetch_id = %ticket.id,
            items = count,
            "Collection refreshed"
        );
        self.updates.send_replace(snapshot);
        true
    }

    /// Record a failed fetch. Items from the last good fetch stay visible.
    pub fn fail(&self, ticket: FetchTicket, message: impl Into<String>) -> bool {
        let mut state = rw_write(&self.state, SOURCE, "fail");
        if state.in_flight != Some(ticket.generation) {
            drop(state);
            self.record_discard(ticket, "fail");
            return false;
        }

        let message = message.into();
        let previous = &state.snapshot;
        let snapshot = Arc::new(CacheSnapshot {
            status: CacheStatus::Error,
            items: Arc::clone(&previous.items),
            error: Some(message.clone()),
            last_fetch: previous.last_fetch,
        });
        state.snapshot = Arc::clone(&snapshot);
        state.in_flight = None;
        drop(state);

        info!(
            target = "fiidbak::cache",
            cache = %self.label,
            fetch_id = %ticket.id,
            error = %message,
            "Collection fetch failed; keeping previous items"
        );
        self.updates.send_replace(snapshot);
        true
    }

    /// Force the next staleness check to report stale. Items are untouched.
    pub fn mark_stale(&self) {
        rw_write(&self.state, SOURCE, "mark_stale").marked_stale = true;
        debug!(target = "fiidbak::cache", cache = %self.label, "Collection marked stale");
    }

    /// Return to `Empty`, abandoning any in-flight fetch.
    pub fn reset(&self) {
        let snapshot = Arc::new(CacheSnapshot::empty());
        {
            let mut state = rw_write(&self.state, SOURCE, "reset");
            state.generation += 1;
            state.in_flight = None;
            state.marked_stale = false;
            state.snapshot = Arc::clone(&snapshot);
        }
        self.updates.send_replace(snapshot);
    }

    /// Seed an empty cache from persisted data. Ignored once the cache has
    /// been populated or a fetch is running.
    pub fn restore(&self, items: Vec<T>, last_fetch: OffsetDateTime, marked_stale: bool) -> bool {
        let mut state = rw_write(&self.state, SOURCE, "restore");
        if state.snapshot.status != CacheStatus::Empty || state.in_flight.is_some() {
            return false;
        }

        let snapshot = Arc::new(CacheSnapshot {
            status: CacheStatus::Ready,
            items: Arc::new(items),
            error: None,
            last_fetch: Some(last_fetch),
        });
        state.snapshot = Arc::clone(&snapshot);
        state.marked_stale = marked_stale;
        drop(state);

        self.updates.send_replace(snapshot);
        true
    }

    pub fn find(&self, predicate: impl Fn(&T) -> bool) -> Option<T> {
        self.snapshot().items.iter().find(|item| predicate(item)).cloned()
    }

    fn record_discard(&self, ticket: FetchTicket, op: &'static str) {
        counter!(METRIC_FETCH_DISCARDED, "cache" => self.label.clone()).increment(1);
        debug!(
            target = "fiidbak::cache",
            cache = %self.label,
            fetch_id = %ticket.id,
            generation = ticket.generation,
            op,
            "Discarded superseded fetch result"
        );
    }
}
