use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("entry {index}: field `{field}` {reason}")]
    Decode {
        index: usize,
        field: &'static str,
        reason: String,
    },
    #[error("domain validation failed: {message}")]
    Validation { message: String },
}

impl DomainError {
    pub fn decode(index: usize, field: &'static str, reason: impl Into<String>) -> Self {
        Self::Decode {
            index,
            field,
            reason: reason.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}
