//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    num::{NonZeroU32, NonZeroU64, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

mod cli;

pub use cli::{
    ClaimBadgeArgs, CliArgs, Command, CreateProductArgs, FeedbackArgs, GlobalOverrides,
    SubmitFeedbackArgs, TierArgs, ViewArgs, VoteArgs,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "fiidbak";
const ENV_PREFIX: &str = "FIIDBAK";
const DEFAULT_LEDGER_URL: &str = "http://127.0.0.1:8545/";
const DEFAULT_LEDGER_BATCH_SIZE: u64 = 50;
const DEFAULT_LEDGER_MAX_ENTITIES: u64 = 500;
const DEFAULT_LEDGER_TIMEOUT_SECS: u64 = 30;
const DEFAULT_GATEWAY_URL: &str = "https://ipfs.io/ipfs/";
const DEFAULT_PINNING_URL: &str = "https://api.pinata.cloud/pinning/";
const DEFAULT_RESOLVE_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RESOLVE_RETRIES: u8 = 1;
const DEFAULT_MAX_CONCURRENCY: u64 = 16;
const DEFAULT_STALE_AFTER_SECS: u64 = 300;
const DEFAULT_PAGE_SIZE: u64 = 12;

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub ledger: LedgerSettings,
    pub content: ContentSettings,
    pub cache: CacheSettings,
    pub display: DisplaySettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct LedgerSettings {
    pub url: Url,
    pub batch_size: NonZeroU32,
    pub max_entities: NonZeroU32,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub gateway_url: Url,
    pub pinning_url: Url,
    pub jwt: Option<String>,
    pub resolve_timeout: Duration,
    pub resolve_retries: u8,
    pub max_concurrency: NonZeroUsize,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub stale_after_seconds: NonZeroU64,
    pub persist_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct DisplaySettings {
    pub unnamed_label: String,
    pub placeholder_image: String,
    pub page_size: NonZeroUsize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    ledger: RawLedgerSettings,
    content: RawContentSettings,
    cache: RawCacheSettings,
    display: RawDisplaySettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(url) = overrides.ledger_url.as_ref() {
            self.ledger.url = Some(url.clone());
        }
        if let Some(url) = overrides.gateway_url.as_ref() {
            self.content.gateway_url = Some(url.clone());
        }
        if let Some(path) = overrides.cache_file.as_ref() {
            self.cache.persist_path = Some(path.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            ledger,
            content,
            cache,
            display,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            ledger: build_ledger_settings(ledger)?,
            content: build_content_settings(content)?,
            cache: build_cache_settings(cache)?,
            display: build_display_settings(display)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_ledger_settings(ledger: RawLedgerSettings) -> Result<LedgerSettings, LoadError> {
    let url = base_url(ledger.url.as_deref().unwrap_or(DEFAULT_LEDGER_URL), "ledger.url")?;
    let batch_size = non_zero_u32(
        ledger.batch_size.unwrap_or(DEFAULT_LEDGER_BATCH_SIZE),
        "ledger.batch_size",
    )?;
    let max_entities = non_zero_u32(
        ledger.max_entities.unwrap_or(DEFAULT_LEDGER_MAX_ENTITIES),
        "ledger.max_entities",
    )?;
    let timeout = non_zero_u64(
        ledger
            .request_timeout_seconds
            .unwrap_or(DEFAULT_LEDGER_TIMEOUT_SECS),
        "ledger.request_timeout_seconds",
    )?;

    Ok(LedgerSettings {
        url,
        batch_size,
        max_entities,
        request_timeout: Duration::from_secs(timeout.get()),
    })
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let gateway_url = base_url(
        content.gateway_url.as_deref().unwrap_or(DEFAULT_GATEWAY_URL),
        "content.gateway_url",
    )?;
    let pinning_url = base_url(
        content.pinning_url.as_deref().unwrap_or(DEFAULT_PINNING_URL),
        "content.pinning_url",
    )?;
    let jwt = content.jwt.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });
    let resolve_timeout = non_zero_u64(
        content
            .resolve_timeout_seconds
            .unwrap_or(DEFAULT_RESOLVE_TIMEOUT_SECS),
        "content.resolve_timeout_seconds",
    )?;
    let resolve_retries = content.resolve_retries.unwrap_or(DEFAULT_RESOLVE_RETRIES);
    if resolve_retries > 1 {
        return Err(LoadError::invalid(
            "content.resolve_retries",
            "at most one retry is allowed",
        ));
    }
    let max_concurrency = non_zero_usize(
        content.max_concurrency.unwrap_or(DEFAULT_MAX_CONCURRENCY),
        "content.max_concurrency",
    )?;

    Ok(ContentSettings {
        gateway_url,
        pinning_url,
        jwt,
        resolve_timeout: Duration::from_secs(resolve_timeout.get()),
        resolve_retries,
        max_concurrency,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let stale_after_seconds = non_zero_u64(
        cache.stale_after_seconds.unwrap_or(DEFAULT_STALE_AFTER_SECS),
        "cache.stale_after_seconds",
    )?;
    let persist_path = cache
        .persist_path
        .filter(|path| !path.as_os_str().is_empty());

    Ok(CacheSettings {
        stale_after_seconds,
        persist_path,
    })
}

fn build_display_settings(display: RawDisplaySettings) -> Result<DisplaySettings, LoadError> {
    let unnamed_label = non_blank(
        display.unnamed_label,
        crate::application::merge::DEFAULT_UNNAMED_LABEL,
        "display.unnamed_label",
    )?;
    let placeholder_image = non_blank(
        display.placeholder_image,
        crate::application::merge::DEFAULT_PLACEHOLDER_IMAGE,
        "display.placeholder_image",
    )?;
    let page_size = non_zero_usize(
        display.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
        "display.page_size",
    )?;

    Ok(DisplaySettings {
        unnamed_label,
        placeholder_image,
        page_size,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLedgerSettings {
    url: Option<String>,
    batch_size: Option<u64>,
    max_entities: Option<u64>,
    request_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    gateway_url: Option<String>,
    pinning_url: Option<String>,
    jwt: Option<String>,
    resolve_timeout_seconds: Option<u64>,
    resolve_retries: Option<u8>,
    max_concurrency: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    stale_after_seconds: Option<u64>,
    persist_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDisplaySettings {
    unnamed_label: Option<String>,
    placeholder_image: Option<String>,
    page_size: Option<u64>,
}

/// Parse an absolute http(s) URL and make sure relative joins stay beneath it.
fn base_url(value: &str, key: &'static str) -> Result<Url, LoadError> {
    let trimmed = value.trim();
    let mut url = Url::parse(trimmed)
        .map_err(|err| LoadError::invalid(key, format!("`{trimmed}` is not a valid URL: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(LoadError::invalid(key, "scheme must be http or https"));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn non_blank(
    value: Option<String>,
    default: &str,
    key: &'static str,
) -> Result<String, LoadError> {
    match value {
        None => Ok(default.to_string()),
        Some(text) if text.trim().is_empty() => Err(LoadError::invalid(key, "must not be blank")),
        Some(text) => Ok(text.trim().to_string()),
    }
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_zero_u64(value: u64, key: &'static str) -> Result<NonZeroU64, LoadError> {
    NonZeroU64::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
