//! Fiidbak client cache.
//!
//! Each merged collection lives in a [`CollectionCache`]:
//!
//! - **Empty** until the first fetch starts
//! - **Loading** while a fetch is in flight, with previous items still visible
//! - **Ready** after a successful fetch
//! - **Error** after a failed fetch, keeping the last good items
//!
//! The cache never refetches on its own; callers consult
//! [`CollectionCache::is_stale`] and start a fetch explicitly.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! stale_after_seconds = 300
//! persist_path = "state/products.json"
//! ```

mod config;
mod lock;
pub mod persist;
mod registry;
mod store;

pub use config::CacheConfig;
pub use persist::PersistError;
pub use registry::CacheRegistry;
pub use store::{CacheSnapshot, CacheStatus, CollectionCache, FetchTicket};
