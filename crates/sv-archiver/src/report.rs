//! Run reports.
//!
//! A run never fails because one profile or category did; the outcome of
//! every fetch is recorded here instead.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sv_ingestion::IngestionError;
use sv_types::{Category, Item, ResultSet};

/// Outcome of one category fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    /// Every page fetched.
    Complete,
    /// Some pages fetched before an API error.
    Partial,
    /// The API refused the first page.
    Failed,
    /// The fetch aborted (transport, decode or signing failure).
    Error,
}

/// One category of one profile.
#[derive(Debug, Clone, Serialize)]
pub struct CategoryReport {
    pub category: Category,
    pub status: FetchStatus,
    pub items: usize,
    pub pages: usize,

    /// Publish time of the newest record fetched.
    pub latest: Option<DateTime<Utc>>,

    pub error: Option<String>,

    /// The fetched records.
    #[serde(skip)]
    pub records: Vec<Item>,
}

impl CategoryReport {
    pub(crate) fn from_result(category: Category, result: ResultSet) -> Self {
        let status = match &result {
            ResultSet::Complete { .. } => FetchStatus::Complete,
            ResultSet::Partial { .. } => FetchStatus::Partial,
            ResultSet::Failed(_) => FetchStatus::Failed,
        };
        let pages = result.pages();
        let error = result.error().map(ToString::to_string);
        let records = result.into_items();

        Self {
            category,
            status,
            items: records.len(),
            pages,
            latest: records.iter().filter_map(Item::posted_at).max(),
            error,
            records,
        }
    }

    pub(crate) fn from_error(category: Category, error: &IngestionError) -> Self {
        Self {
            category,
            status: FetchStatus::Error,
            items: 0,
            pages: 0,
            latest: None,
            error: Some(error.to_string()),
            records: Vec::new(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == FetchStatus::Complete
    }
}

/// Everything done for one profile.
#[derive(Debug, Clone, Serialize)]
pub struct ProfileReport {
    pub profile: String,

    /// Numeric id resolved from user-info.
    pub user_id: Option<String>,

    /// Lower publish-time bound applied to age-filtered categories.
    pub after: Option<DateTime<Utc>>,

    pub categories: Vec<CategoryReport>,

    /// Why the profile could not be processed at all.
    pub error: Option<String>,

    /// The run was cancelled before this profile finished.
    pub cancelled: bool,
}

impl ProfileReport {
    pub(crate) fn new(profile: &str) -> Self {
        Self {
            profile: profile.to_string(),
            user_id: None,
            after: None,
            categories: Vec::new(),
            error: None,
            cancelled: false,
        }
    }

    /// The report of `category`, if it was fetched.
    pub fn category(&self, category: Category) -> Option<&CategoryReport> {
        self.categories.iter().find(|c| c.category == category)
    }

    pub fn total_items(&self) -> usize {
        self.categories.iter().map(|c| c.items).sum()
    }

    /// No profile-level error, no cancellation, every category complete.
    pub fn is_ok(&self) -> bool {
        self.error.is_none() && !self.cancelled && self.categories.iter().all(|c| c.is_complete())
    }
}

/// Result of [`crate::Archiver::run`].
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Per-profile reports, in selection order.
    pub profiles: Vec<ProfileReport>,

    /// Profiles left out because of the skip list.
    pub skipped: Vec<String>,

    pub cancelled: bool,
}

impl RunReport {
    pub fn profile(&self, name: &str) -> Option<&ProfileReport> {
        self.profiles.iter().find(|p| p.profile == name)
    }

    pub fn total_items(&self) -> usize {
        self.profiles.iter().map(ProfileReport::total_items).sum()
    }

    /// Profiles with any error or incomplete category.
    pub fn failed_profiles(&self) -> Vec<&str> {
        self.profiles
            .iter()
            .filter(|p| !p.is_ok())
            .map(|p| p.profile.as_str())
            .collect()
    }

    /// One line per profile, for console output.
    pub fn summary(&self) -> String {
        let mut lines = Vec::with_capacity(self.profiles.len() + 1);
        for profile in &self.profiles {
            let line = match &profile.error {
                Some(error) => format!("{}: failed ({})", profile.profile, error),
                None => {
                    let categories = profile
                        .categories
                        .iter()
                        .map(|c| match c.status {
                            FetchStatus::Complete => format!("{} {}", c.category, c.items),
                            _ => format!("{} {} ({:?})", c.category, c.items, c.status),
                        })
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("{}: {}", profile.profile, categories)
                }
            };
            lines.push(line);
        }
        lines.push(format!(
            "{} items from {} profiles ({} skipped){}",
            self.total_items(),
            self.profiles.len(),
            self.skipped.len(),
            if self.cancelled { ", cancelled" } else { "" }
        ));
        lines.join("\n")
    }
}
