//! Fetch outcomes.

use crate::Item;
use serde::{Deserialize, Serialize};
use std::fmt;

/// An application-level error reported by the API.
///
/// Either a non-success HTTP status or a success status whose body carries an
/// `error` object. These are values, not `Err`s: the caller decides whether
/// to skip the category and carry on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub message: String,
    pub status: Option<u16>,
}

impl ApiError {
    pub fn new(message: impl Into<String>, status: Option<u16>) -> Self {
        Self {
            message: message.into(),
            status,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (HTTP {})", self.message, status),
            None => f.write_str(&self.message),
        }
    }
}

/// Merged result of a paginated fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultSet {
    /// Every page was fetched.
    Complete { items: Vec<Item>, pages: usize },

    /// A later page failed; `items` holds the pages fetched before it.
    Partial {
        items: Vec<Item>,
        pages: usize,
        error: ApiError,
    },

    /// The first page failed, or partial results were discarded.
    Failed(ApiError),
}

impl ResultSet {
    /// Items fetched, empty for [`ResultSet::Failed`].
    pub fn items(&self) -> &[Item] {
        match self {
            ResultSet::Complete { items, .. } | ResultSet::Partial { items, .. } => items,
            ResultSet::Failed(_) => &[],
        }
    }

    pub fn into_items(self) -> Vec<Item> {
        match self {
            ResultSet::Complete { items, .. } | ResultSet::Partial { items, .. } => items,
            ResultSet::Failed(_) => Vec::new(),
        }
    }

    pub fn error(&self) -> Option<&ApiError> {
        match self {
            ResultSet::Complete { .. } => None,
            ResultSet::Partial { error, .. } | ResultSet::Failed(error) => Some(error),
        }
    }

    /// Number of pages successfully fetched.
    pub fn pages(&self) -> usize {
        match self {
            ResultSet::Complete { pages, .. } | ResultSet::Partial { pages, .. } => *pages,
            ResultSet::Failed(_) => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.items().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items().is_empty()
    }

    pub fn is_complete(&self) -> bool {
        matches!(self, ResultSet::Complete { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ResultSet::Failed(_))
    }

    /// Turn a partial result into a failure, dropping the accumulated items.
    pub fn discard_partial(self) -> Self {
        match self {
            ResultSet::Partial { error, .. } => ResultSet::Failed(error),
            other => other,
        }
    }
}
