//! Unified error types for Ledgerly.
//!
//! Core modules return [`Result`]; the HTTP layer maps each variant to a status
//! code in [`crate::api::response::ApiError`].

use thiserror::Error;

/// Every failure the service can produce.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Database error bubbled up from `SeaORM`
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Request input was missing or invalid
    #[error("{message}")]
    Validation {
        /// Human-readable reason
        message: String,
    },

    /// A referenced record does not exist
    #[error("{entity} not found: {key}")]
    NotFound {
        /// Kind of record (e.g. "Task")
        entity: &'static str,
        /// The id or code that was looked up
        key: String,
    },

    /// A task claim was attempted on a task that is not COMPLETED
    #[error("Task {code} cannot be claimed (status: {status})")]
    TaskNotClaimable {
        /// Task code
        code: String,
        /// Current status of the user's task, or "MISSING"
        status: String,
    },

    /// OCR engine failed
    #[error("OCR failed: {message}")]
    Ocr {
        /// Engine output or spawn error
        message: String,
    },

    /// LLM provider failed
    #[error("{message}")]
    Llm {
        /// Provider error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a [`Error::NotFound`] error.
    pub fn not_found(entity: &'static str, key: impl ToString) -> Self {
        Self::NotFound {
            entity,
            key: key.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
