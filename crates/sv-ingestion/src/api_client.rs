//! Signed, paginated HTTP client for the platform API.
//!
//! # Pagination Strategy
//!
//! One logical fetch is a loop over pages:
//! 1. Snapshot the session and sign the page with a fresh timestamp
//! 2. Send the request and classify the response
//! 3. Append the page's items, skipping ids already seen at page boundaries
//! 4. Ask [`crate::pagination::next_step`] whether and how to continue
//!
//! The continuation parameter and the stop condition depend on the
//! category's [`sv_types::Pagination`] class; see [`crate::pagination`].
//!
//! # Errors
//!
//! Transport failures abort the whole fetch as `Err`. Application errors
//! (non-2xx, or an `error` object in a 2xx body) are data: on the first page
//! they yield [`ResultSet::Failed`], on later pages the configured
//! [`PartialPolicy`] decides between [`ResultSet::Partial`] and `Failed`.

use crate::config::{ApiConfig, PartialPolicy};
use crate::error::IngestionError;
use crate::headers::build_headers;
use crate::pagination::{initial_params, next_step, Page, PageCursor, Step};
use crate::request::FetchRequest;
use crate::session::SessionStore;
use crate::signer::{sign, API_PREFIX};
use reqwest::StatusCode;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::Arc;
use sv_types::{ApiError, Category, Item, Pagination, QueryParams, ResultSet};
use tokio_util::sync::CancellationToken;

/// Direct API client.
///
/// Cheap to share behind an `Arc`; the session store is consulted for every
/// page so rotated rules take effect mid-run.
pub struct ApiClient {
    http_client: reqwest::Client,
    config: ApiConfig,
    session: Arc<SessionStore>,
}

/// What a single page request produced.
#[derive(Debug)]
enum PageOutcome {
    Page(Page),
    ApiError(ApiError),
}

impl ApiClient {
    /// Create a client with the configured timeouts.
    ///
    /// No connection is made until the first request.
    pub fn new(config: ApiConfig, session: Arc<SessionStore>) -> Result<Self, IngestionError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| IngestionError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            config,
            session,
        })
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    /// Fetch every page of `category` at `path`, without an age bound.
    pub async fn fetch(&self, category: Category, path: &str) -> Result<ResultSet, IngestionError> {
        self.fetch_with(&FetchRequest::new(category, path), &CancellationToken::new())
            .await
    }

    /// Fetch every page of `request`, stopping early if `cancel` fires.
    ///
    /// # Returns
    ///
    /// Items in server order across pages, deduplicated by id.
    ///
    /// # Errors
    ///
    /// - [`IngestionError::Transport`] if any request fails below HTTP
    /// - [`IngestionError::Decode`] if a body is not in a known shape
    /// - [`IngestionError::Sign`] if the session cannot sign the request
    /// - [`IngestionError::Cancelled`] if `cancel` fired
    pub async fn fetch_with(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<ResultSet, IngestionError> {
        let limit = self.config.page_limit;
        let after = request.after_param();
        let mut params = initial_params(request.category, limit, after.as_deref());
        let mut cursor: Option<PageCursor> = None;

        let mut items: Vec<Item> = Vec::new();
        let mut seen_ids: HashSet<String> = HashSet::new();
        let mut pages = 0usize;

        loop {
            if cancel.is_cancelled() {
                return Err(IngestionError::Cancelled);
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(IngestionError::Cancelled),
                outcome = self.fetch_page(request, &params) => outcome?,
            };

            let page = match outcome {
                PageOutcome::Page(page) => page,
                PageOutcome::ApiError(error) if pages == 0 => {
                    tracing::warn!("{} {} failed: {}", request.category, request.path, error);
                    return Ok(ResultSet::Failed(error));
                }
                PageOutcome::ApiError(error) => {
                    tracing::warn!(
                        "{} {} failed after {} pages ({} items): {}",
                        request.category,
                        request.path,
                        pages,
                        items.len(),
                        error
                    );
                    let partial = ResultSet::Partial {
                        items,
                        pages,
                        error,
                    };
                    return Ok(match self.config.partial_policy {
                        PartialPolicy::Keep => partial,
                        PartialPolicy::Discard => partial.discard_partial(),
                    });
                }
            };

            pages += 1;
            let step = next_step(request.category, &page, limit, cursor.as_ref());
            let received = page.items.len();

            for item in page.items {
                if let Some(id) = item.id() {
                    if !seen_ids.insert(id) {
                        continue;
                    }
                }
                items.push(item);
            }

            tracing::debug!(
                "{} page {}: {} items ({} total)",
                request.path,
                pages,
                received,
                items.len()
            );

            match step {
                Step::Done => break,
                Step::Stuck(reason) => {
                    tracing::warn!(
                        "Stopping {} after {} pages: {}",
                        request.path,
                        pages,
                        reason
                    );
                    break;
                }
                Step::Continue(next) => {
                    next.apply(&mut params);
                    cursor = Some(next);
                }
            }
        }

        tracing::info!(
            "Fetched {} {} items from {} in {} pages",
            items.len(),
            request.category,
            request.path,
            pages
        );
        Ok(ResultSet::Complete { items, pages })
    }

    /// Sign, send and classify one page.
    async fn fetch_page(
        &self,
        request: &FetchRequest,
        params: &QueryParams,
    ) -> Result<PageOutcome, IngestionError> {
        let session = self.session.snapshot().await;
        let signature = sign(
            &request.path,
            params,
            session.credentials(),
            session.rules(),
            chrono::Utc::now().timestamp(),
        )?;

        let origin = self.config.origin();
        let headers = build_headers(&session, &signature, &format!("{origin}/"))?;
        let url = format!("{origin}{API_PREFIX}{}", request.path);

        let mut builder = self.http_client.get(&url).headers(headers);
        if !params.is_empty() {
            builder = builder.query(params.as_slice());
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        classify(request.category, status, &body)
    }
}

/// Sort a response into a page, an application error, or a decode failure.
fn classify(
    category: Category,
    status: StatusCode,
    body: &str,
) -> Result<PageOutcome, IngestionError> {
    let parsed = serde_json::from_str::<Value>(body);

    if !status.is_success() {
        let message = parsed
            .ok()
            .as_ref()
            .and_then(Value::as_object)
            .and_then(error_message)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
        return Ok(PageOutcome::ApiError(ApiError::new(
            message,
            Some(status.as_u16()),
        )));
    }

    let value = parsed.map_err(|e| IngestionError::Decode(format!("response is not JSON: {e}")))?;

    match value {
        Value::Array(values) => Ok(PageOutcome::Page(Page {
            items: to_items(values)?,
            has_more: None,
        })),
        Value::Object(mut map) => {
            if let Some(message) = error_message(&map) {
                return Ok(PageOutcome::ApiError(ApiError::new(message, None)));
            }
            if let Some(Value::Array(list)) = map.remove("list") {
                let has_more = map.get("hasMore").and_then(Value::as_bool);
                return Ok(PageOutcome::Page(Page {
                    items: to_items(list)?,
                    has_more,
                }));
            }
            if category.pagination() == Pagination::SingleShot {
                return Ok(PageOutcome::Page(Page {
                    items: vec![Item::new(map)],
                    has_more: None,
                }));
            }
            Err(IngestionError::Decode(format!(
                "expected a list for {category}, got an object"
            )))
        }
        other => Err(IngestionError::Decode(format!(
            "unexpected response body for {category}: {other}"
        ))),
    }
}

/// The message of a non-null `error` field, if the body has one.
fn error_message(body: &Map<String, Value>) -> Option<String> {
    match body.get("error")? {
        Value::Null => None,
        Value::String(message) => Some(message.clone()),
        Value::Object(error) => Some(
            error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| Value::Object(error.clone()).to_string()),
        ),
        other => Some(other.to_string()),
    }
}

fn to_items(values: Vec<Value>) -> Result<Vec<Item>, IngestionError> {
    values
        .into_iter()
        .map(|v| Item::from_value(v).map_err(|e| IngestionError::Decode(e.to_string())))
        .collect()
}
