//! # sv-ingestion
//!
//! Data ingestion layer for the subscription platform API.
//!
//! This crate provides a [`DataSource`] trait over the platform's signed,
//! paginated JSON endpoints, with a live implementation and a mock.
//!
//! ## Design Principles
//!
//! - **Zero-cost async**: Uses native async traits (Rust 1.75+), avoiding
//!   the heap allocations that `async_trait` would require.
//!
//! - **Errors as data**: Application errors from the API are part of the
//!   returned [`ResultSet`]; only transport, decode, signing and
//!   configuration failures are `Err`.
//!
//! - **Testable**: The [`MockSource`] implementation allows testing without
//!   network calls.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sv_ingestion::{ApiClient, ApiConfig, SessionStore};
//! use sv_types::Category;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Arc::new(SessionStore::load("credentials.json", "rules.json").await?);
//!     let client = ApiClient::new(ApiConfig::default(), session)?;
//!
//!     let result = client.fetch(Category::Purchased, "/posts/paid").await?;
//!     println!("Fetched {} items in {} pages", result.len(), result.pages());
//!     Ok(())
//! }
//! ```
//!
//! ## Signing
//!
//! Every request is signed with the current [`SigningRules`](sv_types::SigningRules)
//! (see [`signer`]). Rules rotate, so [`SessionStore`] can reload them from
//! disk while a run is in progress.
//!
//! ## Pagination
//!
//! Each category belongs to one pagination class (see [`pagination`]). The
//! client stops on a short page, on `hasMore == false` for messages, or when
//! the continuation value stops advancing.

mod api_client;
pub mod config;
pub mod error;
mod headers;
mod mock;
pub mod pagination;
mod request;
mod session;
pub mod signer;
mod source;

pub use api_client::ApiClient;
pub use config::{ApiConfig, PartialPolicy};
pub use error::{IngestionError, SignError};
pub use mock::{MockResponse, MockSource};
pub use request::FetchRequest;
pub use session::{Session, SessionStore};
pub use signer::Signature;
pub use source::PlatformSource;

// Re-export the shared types that appear in our public API.
pub use sv_types::{ApiError, Category, Item, ResultSet};

use tokio_util::sync::CancellationToken;

/// Data source abstraction for the platform API.
///
/// It uses native async syntax (Rust 1.75+) rather than `async_trait`
/// to avoid heap allocations from `Box<dyn Future>`.
///
/// ## Implementors
///
/// - [`PlatformSource`]: Live implementation over [`ApiClient`]
/// - [`MockSource`]: Test implementation with configurable responses
///
/// ## Why `Send + Sync`?
///
/// Sources are shared across concurrently running profile tasks.
pub trait DataSource: Send + Sync {
    /// Fetch every page of `request`.
    ///
    /// # Returns
    ///
    /// The merged [`ResultSet`]. Application errors reported by the API are
    /// carried inside it.
    ///
    /// # Errors
    ///
    /// Returns [`IngestionError::Transport`] if the network fails,
    /// [`IngestionError::Cancelled`] if `cancel` fires before the fetch ends.
    fn fetch(
        &self,
        request: &FetchRequest,
        cancel: &CancellationToken,
    ) -> impl std::future::Future<Output = Result<ResultSet, IngestionError>> + Send;
}
