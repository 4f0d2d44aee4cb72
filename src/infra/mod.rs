//! Infrastructure adapters and runtime bootstrap.

pub mod content_http;
pub mod error;
pub mod ledger_http;
pub mod telemetry;

/// `User-Agent` sent by every outbound request.
pub(crate) fn user_agent() -> &'static str {
    concat!("fiidbak/", env!("CARGO_PKG_VERSION"))
}
