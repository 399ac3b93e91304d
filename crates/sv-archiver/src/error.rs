//! Error types for the archiver.

use sv_types::ApiError;
use thiserror::Error;

/// Errors that stop a whole run.
///
/// Failures of a single profile or category never surface here; they are
/// recorded in the [`crate::ProfileReport`] and the run moves on.
#[derive(Debug, Error)]
pub enum ArchiverError {
    /// Error from the ingestion layer.
    #[error("ingestion error: {0}")]
    Ingestion(#[from] sv_ingestion::IngestionError),

    /// The API refused a request the run depends on.
    #[error("API error: {0}")]
    Api(ApiError),

    /// A record did not have the expected shape.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    /// Invalid archiver configuration.
    #[error("config error: {0}")]
    Config(String),
}
