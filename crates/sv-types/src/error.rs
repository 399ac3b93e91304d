//! Error types for sv-types.

use thiserror::Error;

/// Errors raised while parsing or validating shared types.
///
/// Every variant here is a configuration-class failure: it is raised at load
/// time, before any request is issued.
#[derive(Debug, Error)]
pub enum TypeError {
    /// Unknown content category name.
    #[error("invalid category: {0}")]
    InvalidCategory(String),

    /// Missing or malformed credential field.
    #[error("invalid credentials: {0}")]
    InvalidCredentials(String),

    /// Malformed signing rules (bad index list, template, secret).
    #[error("invalid signing rules: {0}")]
    InvalidRules(String),

    /// A record did not have the expected shape.
    #[error("invalid item: {0}")]
    InvalidItem(String),

    /// JSON decoding error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}
