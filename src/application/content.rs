//! Content store seams and the best-effort resolver built on top of them.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use fiidbak_api_types::ContentDocument;
use metrics::counter;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, warn};
use url::Url;

use crate::domain::entities::ContentPayload;

const METRIC_RESOLVE_FAILED: &str = "fiidbak_content_resolve_failed_total";
const MAX_RETRIES: u8 = 1;

#[derive(Debug, Error)]
pub enum ContentError {
    #[error("content handle `{0}` cannot be resolved")]
    InvalidRef(String),
    #[error("content transport error: {0}")]
    Transport(String),
    #[error("content store responded with status {status}")]
    Status { status: u16 },
    #[error("content payload is malformed: {0}")]
    Malformed(String),
    #[error("content request timed out after {0:?}")]
    Timeout(Duration),
    #[error("content upload rejected: {0}")]
    Upload(String),
    #[error("content store credentials are not configured")]
    MissingCredentials,
}

impl ContentError {
    /// Transient failures worth a second attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ContentError::Transport(_) | ContentError::Timeout(_) => true,
            ContentError::Status { status } => *status >= 500,
            _ => false,
        }
    }
}

/// Read side of the content store.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Turn a content handle into a fetchable location.
    async fn locate(&self, content_ref: &str) -> Result<Url, ContentError>;

    /// Fetch and decode the JSON document stored at `url`.
    async fn fetch(&self, url: &Url) -> Result<ContentDocument, ContentError>;
}

/// Write side of the content store.
#[async_trait]
pub trait ContentSink: Send + Sync {
    async fn upload_json(&self, document: &ContentDocument) -> Result<String, ContentError>;

    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, ContentError>;

    /// Public gateway location of stored content.
    fn public_url(&self, content_ref: &str) -> Result<Url, ContentError>;
}

#[derive(Debug, Clone, Copy)]
pub struct ResolverSettings {
    pub timeout: Duration,
    pub retries: u8,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retries: 1,
        }
    }
}

/// Resolves content handles without ever failing the caller.
///
/// Each attempt is bounded by the configured timeout; transient failures are
/// retried at most once. Whatever still fails yields an empty payload.
pub struct ContentResolver {
    source: Arc<dyn ContentSource>,
    settings: ResolverSettings,
}

impl ContentResolver {
    pub fn new(source: Arc<dyn ContentSource>, settings: ResolverSettings) -> Self {
        let settings = ResolverSettings {
            retries: settings.retries.min(MAX_RETRIES),
            ..settings
        };
        Self { source, settings }
    }

    pub async fn resolve(&self, content_ref: &str) -> ContentPayload {
        let mut attempt: u8 = 0;
        loop {
            match self.attempt(content_ref).await {
                Ok(document) => return ContentPayload::from(document),
                Err(err) if err.is_retryable() && attempt < self.settings.retries => {
                    attempt += 1;
                    debug!(content_ref, error = %err, attempt, "Retrying content resolution");
                }
                Err(err) => {
                    warn!(
                        content_ref,
                        error = %err,
                        "Content resolution failed; falling back to defaults"
                    );
                    counter!(METRIC_RESOLVE_FAILED).increment(1);
                    return ContentPayload::default();
                }
            }
        }
    }

    async fn attempt(&self, content_ref: &str) -> Result<ContentDocument, ContentError> {
        let limit = self.settings.timeout;
        timeout(limit, async {
            let url = self.source.locate(content_ref).await?;
            self.source.fetch(&url).await
        })
        .await
        .map_err(|_| ContentError::Timeout(limit))?
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct ScriptedSource {
        responses: Mutex<HashMap<String, Vec<Result<ContentDocument, ContentError>>>>,
        calls: Mutex<Vec<String>>,
        delay: Option<Duration>,
    }

    impl ScriptedSource {
        fn script(self, content_ref: &str, mut results: Vec<Result<ContentDocument, ContentError>>) -> Self {
            results.reverse();
            self.responses
                .lock()
                .unwrap()
                .insert(content_ref.to_string(), results);
            self
        }

        fn calls(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ContentSource for ScriptedSource {
        async fn locate(&self, content_ref: &str) -> Result<Url, ContentError> {
            Url::parse(&format!("https://gateway.test/ipfs/{content_ref}"))
                .map_err(|err| ContentError::InvalidRef(err.to_string()))
        }

        async fn fetch(&self, url: &Url) -> Result<ContentDocument, ContentError> {
            let key = url.path().trim_start_matches("/ipfs/").to_string();
            self.calls.lock().unwrap().push(key.clone());
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.responses
                .lock()
                .unwrap()
                .get_mut(&key)
                .and_then(|queue| queue.pop())
                .unwrap_or(Err(ContentError::Status { status: 404 }))
        }
    }

    fn widget() -> ContentDocument {
        ContentDocument {
            name: Some("Widget".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn resolves_document_into_payload() {
        let source = Arc::new(ScriptedSource::default().script("abc", vec![Ok(widget())]));
        let resolver = ContentResolver::new(source.clone(), ResolverSettings::default());

        let payload = resolver.resolve("abc").await;
        assert_eq!(payload.name.as_deref(), Some("Widget"));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn retries_transient_failure_once() {
        let source = Arc::new(ScriptedSource::default().script(
            "abc",
            vec![Err(ContentError::Transport("reset".into())), Ok(widget())],
        ));
        let resolver = ContentResolver::new(source.clone(), ResolverSettings::default());

        let payload = resolver.resolve("abc").await;
        assert_eq!(payload.name.as_deref(), Some("Widget"));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn gives_up_after_single_retry() {
        let source = Arc::new(ScriptedSource::default().script(
            "abc",
            vec![
                Err(ContentError::Status { status: 502 }),
                Err(ContentError::Status { status: 503 }),
                Ok(widget()),
            ],
        ));
        let settings = ResolverSettings {
            retries: 5,
            ..Default::default()
        };
        let resolver = ContentResolver::new(source.clone(), settings);

        let payload = resolver.resolve("abc").await;
        assert!(payload.is_empty());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn missing_and_malformed_content_are_not_retried() {
        let source = Arc::new(
            ScriptedSource::default()
                .script("bad", vec![Err(ContentError::Malformed("tags".into()))]),
        );
        let resolver = ContentResolver::new(source.clone(), ResolverSettings::default());

        assert!(resolver.resolve("missing").await.is_empty());
        assert!(resolver.resolve("bad").await.is_empty());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_content_times_out_to_empty_payload() {
        let source = Arc::new(ScriptedSource {
            delay: Some(Duration::from_secs(60)),
            ..ScriptedSource::default().script("abc", vec![Ok(widget()), Ok(widget())])
        });
        let settings = ResolverSettings {
            timeout: Duration::from_secs(10),
            retries: 1,
        };
        let resolver = ContentResolver::new(source.clone(), settings);

        let started = tokio::time::Instant::now();
        let payload = resolver.resolve("abc").await;
        assert!(payload.is_empty());
        assert_eq!(source.calls(), 2);
        assert_eq!(started.elapsed(), Duration::from_secs(20));
    }
}
