//! Error types for issuetrack operations.

use crate::domain::IssueId;
use std::io;
use thiserror::Error;

/// The error type for issuetrack operations.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON parsing or serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Issue not found.
    #[error("Issue not found: {0}")]
    IssueNotFound(IssueId),

    /// The value is not a well-formed issue identifier.
    #[error("Invalid issue id: '{0}'")]
    InvalidId(String),

    /// A field value could not be cast to the field's kind.
    #[error("Invalid value for {field}: {reason}")]
    InvalidField {
        /// Wire name of the field.
        field: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// Storage error.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// A specialized Result type for issuetrack operations.
pub type Result<T> = std::result::Result<T, Error>;
