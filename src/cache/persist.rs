//! On-disk snapshot of the products collection.
//!
//! The file carries the items together with the time they were fetched, so a
//! restored collection keeps its original staleness.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::domain::entities::ProductRecord;

use super::store::CollectionCache;

const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("cache file `{path}` could not be accessed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cache file `{path}` is not valid JSON: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl PersistError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn format(path: &Path, source: serde_json::Error) -> Self {
        Self::Format {
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedProducts {
    version: u32,
    #[serde(with = "time::serde::timestamp")]
    last_fetch: OffsetDateTime,
    #[serde(default)]
    stale: bool,
    items: Vec<ProductRecord>,
}

/// Write the collection to `path`. Returns `false` when there is nothing
/// fetched yet to persist.
pub async fn save(
    cache: &CollectionCache<ProductRecord>,
    path: &Path,
) -> Result<bool, PersistError> {
    let snapshot = cache.snapshot();
    let Some(last_fetch) = snapshot.last_fetch else {
        return Ok(false);
    };

    let document = PersistedProducts {
        version: FORMAT_VERSION,
        last_fetch,
        stale: cache.is_marked_stale(),
        items: snapshot.items.as_ref().clone(),
    };
    let bytes = serde_json::to_vec_pretty(&document).map_err(|err| PersistError::format(path, err))?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|err| PersistError::io(parent, err))?;
    }

    let staging = path.with_extension("tmp");
    tokio::fs::write(&staging, &bytes)
        .await
        .map_err(|err| PersistError::io(&staging, err))?;
    tokio::fs::rename(&staging, path)
        .await
        .map_err(|err| PersistError::io(path, err))?;

    info!(
        target = "fiidbak::cache::persist",
        path = %path.display(),
        items = document.items.len(),
        "Saved products snapshot"
    );
    Ok(true)
}

/// Seed `cache` from `path`. A missing file or a snapshot written by another
/// format version leaves the cache untouched and returns `false`.
pub async fn load_into(
    cache: &CollectionCache<ProductRecord>,
    path: &Path,
) -> Result<bool, PersistError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(PersistError::io(path, err)),
    };

    let document: PersistedProducts =
        serde_json::from_slice(&bytes).map_err(|err| PersistError::format(path, err))?;
    if document.version != FORMAT_VERSION {
        warn!(
            target = "fiidbak::cache::persist",
            path = %path.display(),
            found = document.version,
            expected = FORMAT_VERSION,
            "Ignoring products snapshot with unknown format version"
        );
        return Ok(false);
    }

    let count = document.items.len();
    let restored = cache.restore(document.items, document.last_fetch, document.stale);
    if restored {
        info!(
            target = "fiidbak::cache::persist",
            path = %path.display(),
            items = count,
            "Restored products snapshot"
        );
    }
    Ok(restored)
}
