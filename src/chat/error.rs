// Chat error taxonomy
//
// Errors raised before streaming starts. Anything that goes wrong once the
// response is committed travels inside the stream as `ChatEvent::Error`.

use thiserror::Error;

use crate::instruction::ValidationError;

#[derive(Debug, Error)]
pub enum ChatError {
    /// Body is malformed or violates the request schema
    #[error("{message}")]
    InvalidRequest { message: String },

    /// Referenced portfolio does not exist
    #[error("Portfolio '{key}' not found")]
    NotFound { key: String },

    /// Instruction could not be assembled
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The portfolio store failed while resolving records
    #[error("Portfolio store error: {0:#}")]
    Store(anyhow::Error),

    /// Resolution did not finish within the request bound
    #[error("Timed out resolving portfolio after {secs}s")]
    Timeout { secs: u64 },
}

impl ChatError {
    pub fn invalid(message: impl Into<String>) -> Self {
        ChatError::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn store(error: anyhow::Error) -> Self {
        ChatError::Store(error)
    }

    /// Machine-readable error type for response bodies
    pub fn kind(&self) -> &'static str {
        match self {
            ChatError::InvalidRequest { .. } => "invalid_request",
            ChatError::NotFound { .. } => "not_found",
            ChatError::Validation(_) => "validation_error",
            ChatError::Store(_) => "store_error",
            ChatError::Timeout { .. } => "timeout",
        }
    }
}
