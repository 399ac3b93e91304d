//! Mock data source for testing.
//!
//! `MockSource` implements `DataSource` with canned results keyed by
//! endpoint path, allowing tests to run without network calls.
//!
//! # Usage
//!
//! ```rust
//! use sv_ingestion::{DataSource, FetchRequest, MockSource};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = MockSource::new()
//!         .with_items("/users/someone", vec![serde_json::json!({ "id": 42 })]);
//!
//!     let result = mock
//!         .fetch(&FetchRequest::user_info("someone"), &CancellationToken::new())
//!         .await
//!         .unwrap();
//!     assert_eq!(result.len(), 1);
//!     assert_eq!(mock.requests().len(), 1);
//! }
//! ```

use crate::{error::IngestionError, request::FetchRequest, DataSource};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use sv_types::{ApiError, Item, ResultSet};
use tokio_util::sync::CancellationToken;

/// A canned response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    /// Returned as `Ok`.
    Result(ResultSet),
    /// Returned as `Err(IngestionError::Transport)`.
    Transport(String),
}

/// Mock data source for testing.
///
/// Unconfigured paths return an empty complete result. Clones share the
/// request log, so a clone handed to the code under test can be inspected
/// afterwards.
#[derive(Default, Clone)]
pub struct MockSource {
    /// Responses by endpoint path.
    pub responses: HashMap<String, MockResponse>,

    requests: Arc<Mutex<Vec<FetchRequest>>>,
}

impl MockSource {
    /// Create a new empty mock source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `result` for `path` (builder pattern).
    pub fn with_result(mut self, path: impl Into<String>, result: ResultSet) -> Self {
        self.responses
            .insert(path.into(), MockResponse::Result(result));
        self
    }

    /// Return one complete page of `items` for `path`.
    ///
    /// # Panics
    ///
    /// If a value is not a JSON object.
    pub fn with_items(self, path: impl Into<String>, items: Vec<Value>) -> Self {
        let items: Vec<Item> = items
            .into_iter()
            .map(|v| Item::from_value(v).expect("mock items must be JSON objects"))
            .collect();
        self.with_result(path, ResultSet::Complete { items, pages: 1 })
    }

    /// Fail `path` with an application error.
    pub fn with_api_error(self, path: impl Into<String>, error: ApiError) -> Self {
        self.with_result(path, ResultSet::Failed(error))
    }

    /// Fail `path` with a transport error.
    pub fn with_transport_error(mut self, path: impl Into<String>, message: &str) -> Self {
        self.responses
            .insert(path.into(), MockResponse::Transport(message.to_string()));
        self
    }

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.log().clone()
    }

    /// Paths requested so far, in order.
    pub fn requested_paths(&self) -> Vec<String> {
        self.log().iter().map(|r| r.path.clone()).collect()
    }

    fn log(&self) -> std::sync::MutexGuard<'_, Vec<FetchRequest>> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl DataSource for MockSource {
    async fn fetch(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<ResultSet, IngestionError> {
        if cancel.is_cancelled() {
            return Err(IngestionError::Cancelled);
        }
        self.log().push(request.clone());

        let response = self.responses.get(&request.path).cloned();
        match response {
            None => Ok(ResultSet::Complete {
                items: Vec::new(),
                pages: 1,
            }),
            Some(MockResponse::Transport(message)) => Err(IngestionError::Transport(message)),
            Some(MockResponse::Result(result)) => Ok(filter_by_age(result, request)),
        }
    }
}

/// Drop items at or before the request's publish-time bound, the way the
/// server would.
fn filter_by_age(result: ResultSet, request: &FetchRequest) -> ResultSet {
    let Some(after) = request
        .after_publish_time
        .filter(|_| request.category.accepts_age_filter())
    else {
        return result;
    };
    let newer = |items: Vec<Item>| -> Vec<Item> {
        items
            .into_iter()
            .filter(|item| item.posted_at().map_or(true, |t| t.timestamp() > after))
            .collect()
    };
    match result {
        ResultSet::Complete { items, pages } => ResultSet::Complete {
            items: newer(items),
            pages,
        },
        ResultSet::Partial {
            items,
            pages,
            error,
        } => ResultSet::Partial {
            items: newer(items),
            pages,
            error,
        },
        failed => failed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sv_types::Category;

    #[tokio::test]
    async fn test_unconfigured_path_is_empty() {
        let mock = MockSource::new();
        let result = mock
            .fetch(&FetchRequest::purchased(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.is_complete());
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_records_requests_across_clones() {
        let mock = MockSource::new();
        let clone = mock.clone();
        clone
            .fetch(&FetchRequest::subscriptions(), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(mock.requested_paths(), vec!["/subscriptions/subscribes"]);
    }

    #[tokio::test]
    async fn test_transport_error() {
        let mock = MockSource::new().with_transport_error("/posts/paid", "connection reset");
        let result = mock
            .fetch(&FetchRequest::purchased(), &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(IngestionError::Transport(_))));
    }

    #[tokio::test]
    async fn test_api_error_is_failed_result() {
        let mock =
            MockSource::new().with_api_error("/posts/paid", ApiError::new("nope", Some(403)));
        let result = mock
            .fetch(&FetchRequest::purchased(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(result.is_failed());
    }

    #[tokio::test]
    async fn test_age_filter_applies_to_posts() {
        let mock = MockSource::new().with_items(
            "/users/1/posts",
            vec![
                json!({ "id": 1, "postedAtPrecise": "100.000000" }),
                json!({ "id": 2, "postedAtPrecise": "200.000000" }),
            ],
        );
        let request = FetchRequest::for_profile(Category::Posts, "1").with_after(Some(150));
        let result = mock.fetch(&request, &CancellationToken::new()).await.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.items()[0].id().as_deref(), Some("2"));
    }

    #[tokio::test]
    async fn test_cancelled_fetch_is_not_recorded() {
        let mock = MockSource::new();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let result = mock.fetch(&FetchRequest::purchased(), &cancel).await;
        assert!(matches!(result, Err(IngestionError::Cancelled)));
        assert!(mock.requests().is_empty());
    }
}
