//! Error types for morphspace-core.
//!
//! This module defines the central error type [`CoreError`] used throughout
//! the core crate, along with the [`CoreResult<T>`] type alias.

use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Top-level error type for morphspace-core operations.
///
/// Covers validation of job inputs, snapshot (de)serialization and the
/// filesystem traffic around snapshot persistence. Engine-side failures
/// (tree corruption, kernel errors) live in `morphspace-engine`.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A field value failed validation constraints.
    ///
    /// Produced by [`crate::params::MorphingParams::validate`] and by
    /// snapshot intake checks. The job manager decides whether to reject
    /// or repair the offending job.
    #[error("validation error: {field} - {message}")]
    Validation {
        /// Name of the field that failed validation
        field: String,
        /// Description of the validation failure
        message: String,
    },

    /// Error during serialization or deserialization of a snapshot.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error while reading or writing persisted state.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CoreError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for CoreError {
    fn from(err: bincode::Error) -> Self {
        CoreError::Serialization(err.to_string())
    }
}
