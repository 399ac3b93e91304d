//! Core archiver implementation.
//!
//! The `Archiver` resolves which profiles to process, then walks each
//! profile's enabled categories through a [`DataSource`].

use crate::config::ArchiverConfig;
use crate::converter::{is_from, to_profile, to_subscriptions};
use crate::error::ArchiverError;
use crate::report::{CategoryReport, ProfileReport, RunReport};
use crate::watermark::{DirectoryWatermarks, NoWatermarks, Watermarks};
use chrono::{DateTime, Duration, Utc};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use sv_ingestion::{DataSource, FetchRequest, IngestionError};
use sv_types::{Category, ResultSet};
use tokio_util::sync::CancellationToken;

/// Which profiles a run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileSelection {
    /// Every active subscription of the logged-in account.
    All,
    /// The given usernames, in order.
    Named(Vec<String>),
}

/// How far back age-filtered categories reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AgePolicy {
    /// Everything.
    #[default]
    Unbounded,
    /// Only items published in the last `n` days.
    MaxAgeDays(u32),
    /// Only items newer than the profile's watermark.
    Latest,
}

impl AgePolicy {
    /// Policy for a user-supplied day count; `0` means [`AgePolicy::Latest`].
    pub fn from_days(days: u32) -> Self {
        if days == 0 {
            AgePolicy::Latest
        } else {
            AgePolicy::MaxAgeDays(days)
        }
    }

    /// Reject a day count that reaches past the earliest representable date.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), ArchiverError> {
        match self {
            AgePolicy::MaxAgeDays(days) if days_before(now, *days).is_none() => Err(
                ArchiverError::Config(format!("max age of {days} days is out of range")),
            ),
            _ => Ok(()),
        }
    }

    /// The lower publish-time bound for `profile`, if any.
    ///
    /// A day count past the representable range has no bound.
    pub fn cutoff(
        &self,
        profile: &str,
        now: DateTime<Utc>,
        watermarks: &dyn Watermarks,
    ) -> Option<DateTime<Utc>> {
        match self {
            AgePolicy::Unbounded => None,
            AgePolicy::MaxAgeDays(days) => days_before(now, *days),
            AgePolicy::Latest => watermarks.latest(profile),
        }
    }
}

fn days_before(now: DateTime<Utc>, days: u32) -> Option<DateTime<Utc>> {
    now.checked_sub_signed(Duration::days(i64::from(days)))
}

/// Archives profiles through a data source.
///
/// # Example
///
/// ```rust
/// use sv_archiver::{AgePolicy, Archiver, ArchiverConfig, ProfileSelection};
/// use sv_ingestion::MockSource;
/// use tokio_util::sync::CancellationToken;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let source = MockSource::new()
///         .with_items("/users/alice", vec![serde_json::json!({ "id": 1, "username": "alice" })]);
///     let archiver = Archiver::new(source, ArchiverConfig::default());
///
///     let report = archiver
///         .run(
///             &ProfileSelection::Named(vec!["alice".into()]),
///             AgePolicy::Unbounded,
///             &CancellationToken::new(),
///         )
///         .await?;
///     assert!(report.profile("alice").unwrap().is_ok());
///     Ok(())
/// }
/// ```
pub struct Archiver<S: DataSource> {
    source: S,
    config: ArchiverConfig,
    watermarks: Arc<dyn Watermarks>,
}

impl<S: DataSource> Archiver<S> {
    /// Create an archiver.
    ///
    /// With a download directory configured, "latest" resume reads it;
    /// otherwise there are no watermarks until [`Archiver::with_watermarks`].
    pub fn new(source: S, config: ArchiverConfig) -> Self {
        let watermarks: Arc<dyn Watermarks> = match &config.download_dir {
            Some(dir) => Arc::new(DirectoryWatermarks::new(dir)),
            None => Arc::new(NoWatermarks),
        };
        Self {
            source,
            config,
            watermarks,
        }
    }

    /// Replace the watermark source (builder pattern).
    pub fn with_watermarks(mut self, watermarks: impl Watermarks + 'static) -> Self {
        self.watermarks = Arc::new(watermarks);
        self
    }

    pub fn config(&self) -> &ArchiverConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Resolve the usernames to process.
    ///
    /// Returns `(profiles, skipped)`. Duplicates are dropped, keeping the
    /// first occurrence.
    ///
    /// # Errors
    ///
    /// For [`ProfileSelection::All`], [`ArchiverError::Api`] if the
    /// subscription list was refused, or the ingestion error that aborted it.
    pub async fn resolve_profiles(
        &self,
        selection: &ProfileSelection,
        cancel: &CancellationToken,
    ) -> Result<(Vec<String>, Vec<String>), ArchiverError> {
        let requested = match selection {
            ProfileSelection::Named(names) => names.clone(),
            ProfileSelection::All => {
                let result = self
                    .source
                    .fetch(&FetchRequest::subscriptions(), cancel)
                    .await?;
                if let ResultSet::Failed(error) = &result {
                    return Err(ArchiverError::Api(error.clone()));
                }
                if let Some(error) = result.error() {
                    tracing::warn!("Subscription list is incomplete: {}", error);
                }
                let usernames: Vec<String> = to_subscriptions(result.items())
                    .into_iter()
                    .map(|s| s.username)
                    .collect();
                tracing::info!("Found {} active subscriptions", usernames.len());
                usernames
            }
        };

        let mut seen = HashSet::new();
        let mut profiles = Vec::new();
        let mut skipped = Vec::new();
        for name in requested {
            if !seen.insert(name.to_ascii_lowercase()) {
                continue;
            }
            if self.config.is_skipped(&name) {
                tracing::info!("Skipping {}", name);
                skipped.push(name);
            } else {
                profiles.push(name);
            }
        }
        Ok((profiles, skipped))
    }

    /// Archive every selected profile.
    ///
    /// Profiles run concurrently up to `config.concurrency`; categories of a
    /// profile run one after another. A failing profile or category is
    /// recorded and the run continues.
    ///
    /// # Errors
    ///
    /// Only when the profile list itself cannot be resolved.
    pub async fn run(
        &self,
        selection: &ProfileSelection,
        age: AgePolicy,
        cancel: &CancellationToken,
    ) -> Result<RunReport, ArchiverError> {
        let started_at = Utc::now();
        let (profiles, skipped) = self.resolve_profiles(selection, cancel).await?;

        tracing::info!(
            "Archiving {} profiles ({} categories each, concurrency {})",
            profiles.len(),
            self.config.enabled_categories().len(),
            self.config.concurrency
        );

        let mut reports: Vec<(usize, ProfileReport)> =
            stream::iter(profiles.into_iter().enumerate())
                .map(|(index, profile)| async move {
                    let report = self.archive_profile(&profile, age, started_at, cancel).await;
                    (index, report)
                })
                .buffer_unordered(self.config.concurrency.max(1))
                .collect()
                .await;
        reports.sort_by_key(|(index, _)| *index);

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            profiles: reports.into_iter().map(|(_, report)| report).collect(),
            skipped,
            cancelled: cancel.is_cancelled(),
        };

        tracing::info!(
            "Run finished: {} items, {} profiles with problems",
            report.total_items(),
            report.failed_profiles().len()
        );
        Ok(report)
    }

    /// Archive one profile. Never fails; problems land in the report.
    async fn archive_profile(
        &self,
        profile: &str,
        age: AgePolicy,
        now: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> ProfileReport {
        let mut report = ProfileReport::new(profile);
        if cancel.is_cancelled() {
            report.cancelled = true;
            return report;
        }

        let user = match self
            .source
            .fetch(&FetchRequest::user_info(profile), cancel)
            .await
        {
            Ok(result) => match to_profile(&result) {
                Ok(user) => user,
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", profile, e);
                    report.error = Some(e.to_string());
                    return report;
                }
            },
            Err(IngestionError::Cancelled) => {
                report.cancelled = true;
                return report;
            }
            Err(e) => {
                log_fetch_error(profile, Category::UserInfo, &e);
                report.error = Some(e.to_string());
                return report;
            }
        };

        report.user_id = Some(user.id.clone());
        report.after = self.cutoff(profile, age, now).await;
        if let Some(after) = report.after {
            tracing::info!(
                "{}: getting items newer than {} UTC",
                profile,
                after.format("%Y-%m-%d %H:%M")
            );
        }
        let after_secs = report.after.map(|t| t.timestamp());

        for category in self.config.enabled_categories() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let request = FetchRequest::for_profile(category, &user.id).with_after(after_secs);
            match self.source.fetch(&request, cancel).await {
                Ok(result) => {
                    let result = if category == Category::Purchased {
                        only_from(result, &user.id)
                    } else {
                        result
                    };
                    let category_report = CategoryReport::from_result(category, result);
                    tracing::info!(
                        "{}: {} {} ({:?})",
                        profile,
                        category_report.items,
                        category,
                        category_report.status
                    );
                    report.categories.push(category_report);
                }
                Err(IngestionError::Cancelled) => {
                    report.cancelled = true;
                    break;
                }
                Err(e) => {
                    log_fetch_error(profile, category, &e);
                    report.categories.push(CategoryReport::from_error(category, &e));
                }
            }
        }

        report
    }

    /// Watermark lookups may walk the filesystem, so they run off the runtime.
    async fn cutoff(
        &self,
        profile: &str,
        age: AgePolicy,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let watermarks = Arc::clone(&self.watermarks);
        let name = profile.to_string();
        let lookup = move || age.cutoff(&name, now, watermarks.as_ref());
        match tokio::task::spawn_blocking(lookup).await {
            Ok(cutoff) => cutoff,
            Err(e) => {
                tracing::warn!("{}: watermark lookup failed: {}", profile, e);
                None
            }
        }
    }
}

/// Keep only the purchases made from the profile with `user_id`.
fn only_from(result: ResultSet, user_id: &str) -> ResultSet {
    let keep = |items: Vec<_>| -> Vec<_> {
        items
            .into_iter()
            .filter(|item| is_from(item, user_id))
            .collect()
    };
    match result {
        ResultSet::Complete { items, pages } => ResultSet::Complete {
            items: keep(items),
            pages,
        },
        ResultSet::Partial {
            items,
            pages,
            error,
        } => ResultSet::Partial {
            items: keep(items),
            pages,
            error,
        },
        failed => failed,
    }
}

fn log_fetch_error(profile: &str, category: Category, error: &IngestionError) {
    if error.is_transport() {
        tracing::error!("{}: {} failed: {}", profile, category, error);
    } else {
        tracing::warn!("{}: {} failed: {}", profile, category, error);
    }
}
