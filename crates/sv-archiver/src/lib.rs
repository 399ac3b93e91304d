//! sv-archiver: Per-profile archiving runs.
//!
//! This crate provides the [`Archiver`] struct which is the main entry point
//! for walking profiles and their content categories.
//!
//! # Overview
//!
//! The archiver:
//! - Resolves the profiles to process (named, or every active subscription)
//! - Drops accounts on the skip list
//! - Looks up each profile's numeric id, then fetches its enabled categories
//! - Applies an age bound: a number of days, or the profile's watermark
//! - Records every outcome in a [`RunReport`]; one failure never stops the run
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sv_archiver::{AgePolicy, Archiver, ArchiverConfig, ProfileSelection};
//! use sv_ingestion::{ApiConfig, PlatformSource, SessionStore};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = Arc::new(SessionStore::load("credentials.json", "rules.json").await?);
//!     let source = PlatformSource::new(ApiConfig::from_env()?, session)?;
//!     let archiver = Archiver::new(source, ArchiverConfig::from_env()?);
//!
//!     let report = archiver
//!         .run(&ProfileSelection::All, AgePolicy::MaxAgeDays(7), &CancellationToken::new())
//!         .await?;
//!
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```

mod archiver;
mod config;
mod converter;
mod error;
mod report;
mod watermark;

pub use archiver::{AgePolicy, Archiver, ProfileSelection};
pub use config::ArchiverConfig;
pub use converter::{is_from, to_profile, to_subscriptions};
pub use error::ArchiverError;
pub use report::{CategoryReport, FetchStatus, ProfileReport, RunReport};
pub use watermark::{DirectoryWatermarks, NoWatermarks, StaticWatermarks, Watermarks};
