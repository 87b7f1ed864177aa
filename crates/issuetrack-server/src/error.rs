//! Error types for the issuetrack HTTP server.
//!
//! Request handling never fails at this level: the service turns every
//! failure into a reply. These errors cover configuration and startup.

use thiserror::Error;

/// Errors that can occur while configuring or starting the server.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The configuration file could not be parsed.
    #[error("Invalid configuration file {path}: {source}")]
    ConfigFile {
        /// The file that failed to parse.
        path: String,
        /// The underlying YAML error.
        #[source]
        source: serde_yaml::Error,
    },

    /// An error from the issuetrack storage layer.
    #[error("Storage error: {0}")]
    Storage(#[from] issuetrack::error::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for server operations.
pub type Result<T> = std::result::Result<T, Error>;
