//! IPFS-style gateway reads and pinning-service uploads.

use async_trait::async_trait;
use fiidbak_api_types::{ContentDocument, PinResponse};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder};
use tracing::debug;
use url::Url;

use crate::application::content::{ContentError, ContentSink, ContentSource};
use crate::config::ContentSettings;

use super::error::InfraError;
use super::user_agent;

const PIN_JSON_PATH: &str = "pinJSONToIPFS";
const PIN_FILE_PATH: &str = "pinFileToIPFS";

#[derive(Clone)]
pub struct HttpContentStore {
    client: Client,
    gateway: Url,
    pinning: Url,
    jwt: Option<String>,
}

impl HttpContentStore {
    pub fn new(settings: &ContentSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(user_agent())
            .build()
            .map_err(|err| InfraError::http(err.to_string()))?;
        Ok(Self {
            client,
            gateway: settings.gateway_url.clone(),
            pinning: settings.pinning_url.clone(),
            jwt: settings.jwt.clone(),
        })
    }

    fn authorized(&self, path: &str) -> Result<RequestBuilder, ContentError> {
        let jwt = self.jwt.as_deref().ok_or(ContentError::MissingCredentials)?;
        let url = self
            .pinning
            .join(path)
            .map_err(|err| ContentError::Upload(err.to_string()))?;
        Ok(self.client.post(url).bearer_auth(jwt))
    }

    async fn pin(&self, request: RequestBuilder) -> Result<String, ContentError> {
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let bytes = response.bytes().await.map_err(transport)?;
        if !status.is_success() {
            return Err(ContentError::Upload(format!(
                "status {status}: {}",
                String::from_utf8_lossy(&bytes)
            )));
        }
        let pinned: PinResponse = serde_json::from_slice(&bytes)
            .map_err(|err| ContentError::Upload(format!("unexpected response: {err}")))?;
        Ok(pinned.ipfs_hash)
    }
}

fn transport(err: reqwest::Error) -> ContentError {
    ContentError::Transport(err.to_string())
}

/// Reduce a content handle to a bare identifier the gateway can serve.
fn content_id(content_ref: &str) -> Result<&str, ContentError> {
    let trimmed = content_ref.trim();
    let id = trimmed.strip_prefix("ipfs://").unwrap_or(trimmed);
    let id = id.strip_prefix("ipfs/").unwrap_or(id);
    if id.is_empty() || id.contains(['?', '#', ' ', ':']) || id.starts_with('/') {
        return Err(ContentError::InvalidRef(content_ref.to_string()));
    }
    Ok(id)
}

#[async_trait]
impl ContentSource for HttpContentStore {
    async fn locate(&self, content_ref: &str) -> Result<Url, ContentError> {
        self.public_url(content_ref)
    }

    async fn fetch(&self, url: &Url) -> Result<ContentDocument, ContentError> {
        debug!(target = "fiidbak::content", url = %url, "Fetching content");
        let response = self.client.get(url.clone()).send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ContentError::Status {
                status: status.as_u16(),
            });
        }
        let bytes = response.bytes().await.map_err(transport)?;
        serde_json::from_slice(&bytes).map_err(|err| ContentError::Malformed(err.to_string()))
    }
}

#[async_trait]
impl ContentSink for HttpContentStore {
    async fn upload_json(&self, document: &ContentDocument) -> Result<String, ContentError> {
        let request = self.authorized(PIN_JSON_PATH)?.json(document);
        self.pin(request).await
    }

    async fn upload_file(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, ContentError> {
        let mime = mime_guess::from_path(file_name).first_or_octet_stream();
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str(mime.as_ref())
            .map_err(|err| ContentError::Upload(err.to_string()))?;
        let request = self
            .authorized(PIN_FILE_PATH)?
            .multipart(Form::new().part("file", part));
        self.pin(request).await
    }

    fn public_url(&self, content_ref: &str) -> Result<Url, ContentError> {
        let id = content_id(content_ref)?;
        self.gateway
            .join(id)
            .map_err(|_| ContentError::InvalidRef(content_ref.to_string()))
    }
}
