//! Error types for the luna-convert library.

use thiserror::Error;

/// Errors that can occur while selecting, uploading or converting files.
#[derive(Error, Debug)]
pub enum Error {
    /// The request never completed (connection refused, reset, DNS failure...).
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The remote service answered with a non-success status.
    #[error("{endpoint} rejected the request with status {status}")]
    Rejected {
        /// Endpoint path that was called, e.g. `/upload`.
        endpoint: &'static str,
        /// HTTP status code returned by the service.
        status: u16,
    },

    /// The response did not have the expected shape.
    #[error("Malformed response from {endpoint}: {reason}")]
    MalformedResponse {
        /// Endpoint path that was called.
        endpoint: &'static str,
        /// What was wrong with the body.
        reason: String,
    },

    /// Conversion (or session inspection) was requested before any upload succeeded.
    #[error("No active session: upload files first")]
    NoSession,

    /// I/O error while reading a selected file or writing the archive.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("Invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn malformed(endpoint: &'static str, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            endpoint,
            reason: reason.into(),
        }
    }
}

/// A specialized `Result` type for luna-convert operations.
pub type Result<T> = std::result::Result<T, Error>;
