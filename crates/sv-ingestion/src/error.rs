//! Error types for the ingestion layer.
//!
//! Only failures that abort a fetch live here. Application-level API errors
//! (non-2xx, or an `error` object in the body) are returned as data inside
//! [`sv_types::ResultSet`], not as `Err`.

use sv_types::TypeError;
use thiserror::Error;

/// Errors from request signing.
///
/// All are configuration problems: they mean the inputs could never produce
/// a valid signature, so nothing is sent.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignError {
    /// A signed input contains non-ASCII characters.
    #[error("{0} contains non-ASCII characters")]
    NonAscii(&'static str),

    /// A checksum index points past the end of the digest.
    #[error("checksum index {index} is outside the {len}-character digest")]
    IndexOutOfRange { index: usize, len: usize },

    /// The checksum sum does not fit in an `i64`.
    #[error("checksum overflows with the configured constant")]
    ChecksumOverflow,
}

/// Errors that abort a fetch.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// Malformed or missing configuration (credentials, rules, settings).
    #[error("config error: {0}")]
    Config(String),

    /// The request could not be signed.
    #[error("signing error: {0}")]
    Sign(#[from] SignError),

    /// Connection, timeout, DNS or body transfer failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body was not in any shape the API uses.
    #[error("decode error: {0}")]
    Decode(String),

    /// Reading configuration files failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The fetch was cancelled between or during pages.
    #[error("fetch cancelled")]
    Cancelled,
}

impl IngestionError {
    /// Whether this error came from the network rather than from configuration.
    pub fn is_transport(&self) -> bool {
        matches!(self, IngestionError::Transport(_))
    }
}

// Validation failures of shared types are configuration errors.
impl From<TypeError> for IngestionError {
    fn from(err: TypeError) -> Self {
        IngestionError::Config(err.to_string())
    }
}

// Any reqwest error that reaches `?` happened below the HTTP status level.
impl From<reqwest::Error> for IngestionError {
    #[inline]
    fn from(err: reqwest::Error) -> Self {
        IngestionError::Transport(err.to_string())
    }
}
