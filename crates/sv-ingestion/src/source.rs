//! Production data source backed by [`ApiClient`].

use crate::api_client::ApiClient;
use crate::config::ApiConfig;
use crate::error::IngestionError;
use crate::request::FetchRequest;
use crate::session::SessionStore;
use crate::DataSource;
use std::sync::Arc;
use sv_types::ResultSet;
use tokio_util::sync::CancellationToken;

/// Data source that talks to the live API.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use sv_ingestion::{ApiConfig, DataSource, FetchRequest, PlatformSource, SessionStore};
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let session = Arc::new(SessionStore::load("credentials.json", "rules.json").await?);
///     let source = PlatformSource::new(ApiConfig::from_env()?, session)?;
///
///     let result = source
///         .fetch(&FetchRequest::user_info("someone"), &CancellationToken::new())
///         .await?;
///     println!("Got {} records", result.len());
///     Ok(())
/// }
/// ```
pub struct PlatformSource {
    client: ApiClient,
}

impl PlatformSource {
    pub fn new(config: ApiConfig, session: Arc<SessionStore>) -> Result<Self, IngestionError> {
        Ok(Self {
            client: ApiClient::new(config, session)?,
        })
    }

    /// The underlying client, for one-off fetches outside the trait.
    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

impl DataSource for PlatformSource {
    async fn fetch(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> Result<ResultSet, IngestionError> {
        self.client.fetch_with(request, cancel).await
    }
}
