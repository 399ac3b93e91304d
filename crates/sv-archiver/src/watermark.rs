//! "Latest" resume: the newest already-archived date per profile.
//!
//! Archived files are named starting with their publish date
//! (`2024-01-31_...`), so the newest date in a profile's directory tells
//! where to resume.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Source of per-profile resume points.
pub trait Watermarks: Send + Sync {
    /// The newest date already archived for `profile`, if any.
    fn latest(&self, profile: &str) -> Option<DateTime<Utc>>;
}

/// No resume information; every profile is fetched in full.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoWatermarks;

impl Watermarks for NoWatermarks {
    fn latest(&self, _profile: &str) -> Option<DateTime<Utc>> {
        None
    }
}

/// Fixed resume points, e.g. from a previous run's report.
#[derive(Debug, Clone, Default)]
pub struct StaticWatermarks {
    latest: HashMap<String, DateTime<Utc>>,
}

impl StaticWatermarks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the resume point of `profile` (builder pattern).
    pub fn with(mut self, profile: impl Into<String>, latest: DateTime<Utc>) -> Self {
        self.latest.insert(profile.into(), latest);
        self
    }
}

impl Watermarks for StaticWatermarks {
    fn latest(&self, profile: &str) -> Option<DateTime<Utc>> {
        self.latest.get(profile).copied()
    }
}

/// Resume points read from an archive directory.
///
/// Looks at `<root>/<profile>` recursively. Names that do not start with a
/// `YYYY-MM-DD` date are ignored, as are unreadable directories. Symlinked
/// directories are not followed.
///
/// The walk uses blocking filesystem calls.
#[derive(Debug, Clone)]
pub struct DirectoryWatermarks {
    root: PathBuf,
}

impl DirectoryWatermarks {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Watermarks for DirectoryWatermarks {
    fn latest(&self, profile: &str) -> Option<DateTime<Utc>> {
        let mut pending = vec![self.root.join(profile)];
        let mut newest: Option<NaiveDate> = None;

        while let Some(dir) = pending.pop() {
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let Ok(file_type) = entry.file_type() else {
                    continue;
                };
                if file_type.is_dir() {
                    pending.push(entry.path());
                    continue;
                }
                if let Some(date) = entry.file_name().to_str().and_then(leading_date) {
                    newest = newest.max(Some(date));
                }
            }
        }

        newest
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }
}

/// The `YYYY-MM-DD` date a file name starts with.
fn leading_date(name: &str) -> Option<NaiveDate> {
    let prefix = name.get(..10)?;
    NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
}
