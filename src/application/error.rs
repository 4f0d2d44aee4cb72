use std::error::Error as StdError;

use thiserror::Error;

use crate::{
    application::{ledger::LedgerError, submit::SubmitError},
    config::LoadError,
    domain::error::DomainError,
    infra::error::InfraError,
};

/// Flattened error chain, outermost first.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self { source, messages }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] LoadError),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error(transparent)]
    Submit(#[from] SubmitError),
    #[error("failed to load {collection}: {reason}")]
    Unavailable {
        collection: &'static str,
        reason: String,
    },
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Process exit status for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) => 78,
            AppError::Domain(DomainError::Validation { .. })
            | AppError::Validation(_)
            | AppError::Submit(SubmitError::Validation(_))
            | AppError::Submit(SubmitError::InsufficientTier { .. })
            | AppError::Submit(SubmitError::AlreadyVoted { .. })
            | AppError::Submit(SubmitError::NotEligible { .. }) => 65,
            AppError::NotFound(_) => 66,
            AppError::Ledger(_)
            | AppError::Unavailable { .. }
            | AppError::Submit(SubmitError::Ledger(_))
            | AppError::Submit(SubmitError::Content(_)) => 69,
            AppError::Domain(DomainError::Decode { .. })
            | AppError::Infra(_)
            | AppError::Unexpected(_) => 1,
        }
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport::from_error("application::error::AppError", self)
    }
}
