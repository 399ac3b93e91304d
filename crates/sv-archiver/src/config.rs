//! Archiver configuration.
//!
//! # Environment Variables
//!
//! - `SV_SKIP_ACCOUNTS`: comma-separated usernames to leave out
//! - `SV_CONCURRENCY`: profiles processed at once (default: 1)
//! - `SV_POSTS`, `SV_STORIES`, `SV_MESSAGES`, `SV_ARCHIVED`, `SV_PURCHASED`:
//!   category toggles (default: all enabled)
//! - `SV_DOWNLOAD_DIR`: archive root, scanned for already-archived dates

use crate::error::ArchiverError;
use std::env;
use std::path::PathBuf;
use sv_types::Category;

/// Configuration for the [`crate::Archiver`].
#[derive(Debug, Clone)]
pub struct ArchiverConfig {
    pub posts: bool,
    pub stories: bool,
    pub messages: bool,
    pub archived: bool,
    pub purchased: bool,

    /// Usernames never archived, even when listed explicitly.
    pub skip_accounts: Vec<String>,

    /// Maximum number of profiles processed concurrently.
    pub concurrency: usize,

    /// Archive root. When set, "latest" resume looks here.
    pub download_dir: Option<PathBuf>,
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            posts: true,
            stories: true,
            messages: true,
            archived: true,
            purchased: true,
            skip_accounts: Vec::new(),
            concurrency: 1,
            download_dir: None,
        }
    }
}

impl ArchiverConfig {
    /// Load settings from `SV_*` environment variables.
    pub fn from_env() -> Result<Self, ArchiverError> {
        let mut config = Self::default();

        if let Ok(accounts) = env::var("SV_SKIP_ACCOUNTS") {
            config.skip_accounts = split_list(&accounts);
        }
        if let Ok(raw) = env::var("SV_CONCURRENCY") {
            let concurrency = raw.trim().parse().map_err(|_| {
                ArchiverError::Config(format!("SV_CONCURRENCY={raw:?} is not a number"))
            })?;
            config = config.with_concurrency(concurrency)?;
        }
        for (name, flag) in [
            ("SV_POSTS", &mut config.posts),
            ("SV_STORIES", &mut config.stories),
            ("SV_MESSAGES", &mut config.messages),
            ("SV_ARCHIVED", &mut config.archived),
            ("SV_PURCHASED", &mut config.purchased),
        ] {
            if let Ok(raw) = env::var(name) {
                *flag = parse_bool(name, &raw)?;
            }
        }
        if let Ok(dir) = env::var("SV_DOWNLOAD_DIR") {
            if !dir.trim().is_empty() {
                config.download_dir = Some(PathBuf::from(dir));
            }
        }

        Ok(config)
    }

    /// Enable or disable one category (builder pattern).
    ///
    /// Categories that are not per-profile are ignored.
    pub fn with_category(mut self, category: Category, enabled: bool) -> Self {
        match category {
            Category::Posts => self.posts = enabled,
            Category::Stories => self.stories = enabled,
            Category::Messages => self.messages = enabled,
            Category::Archived => self.archived = enabled,
            Category::Purchased => self.purchased = enabled,
            Category::Subscriptions | Category::UserInfo => {}
        }
        self
    }

    /// Enable exactly the given categories.
    pub fn with_only(self, categories: &[Category]) -> Self {
        Self::PROFILE_CATEGORIES
            .iter()
            .fold(self, |config, &c| config.with_category(c, categories.contains(&c)))
    }

    pub fn with_skip_accounts(mut self, accounts: Vec<String>) -> Self {
        self.skip_accounts = accounts;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Result<Self, ArchiverError> {
        if concurrency == 0 {
            return Err(ArchiverError::Config("concurrency must be at least 1".into()));
        }
        self.concurrency = concurrency;
        Ok(self)
    }

    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = Some(dir.into());
        self
    }

    /// Per-profile categories in fetch order.
    const PROFILE_CATEGORIES: [Category; 5] = [
        Category::Posts,
        Category::Stories,
        Category::Messages,
        Category::Archived,
        Category::Purchased,
    ];

    /// The enabled per-profile categories, in fetch order.
    pub fn enabled_categories(&self) -> Vec<Category> {
        Self::PROFILE_CATEGORIES
            .into_iter()
            .filter(|c| match c {
                Category::Posts => self.posts,
                Category::Stories => self.stories,
                Category::Messages => self.messages,
                Category::Archived => self.archived,
                Category::Purchased => self.purchased,
                _ => false,
            })
            .collect()
    }

    /// Whether `profile` is in the skip list (case-insensitive).
    pub fn is_skipped(&self, profile: &str) -> bool {
        self.skip_accounts
            .iter()
            .any(|s| s.eq_ignore_ascii_case(profile))
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_bool(name: &str, raw: &str) -> Result<bool, ArchiverError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ArchiverError::Config(format!(
            "{name}={raw:?} is not a boolean"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_enable_everything() {
        let config = ArchiverConfig::default();
        assert_eq!(
            config.enabled_categories(),
            vec![
                Category::Posts,
                Category::Stories,
                Category::Messages,
                Category::Archived,
                Category::Purchased
            ]
        );
        assert_eq!(config.concurrency, 1);
    }

    #[test]
    fn test_with_only() {
        let config = ArchiverConfig::default().with_only(&[Category::Messages, Category::Posts]);
        assert_eq!(
            config.enabled_categories(),
            vec![Category::Posts, Category::Messages]
        );
    }

    #[test]
    fn test_skip_is_case_insensitive() {
        let config = ArchiverConfig::default().with_skip_accounts(vec!["Alice".into()]);
        assert!(config.is_skipped("alice"));
        assert!(!config.is_skipped("bob"));
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(ArchiverConfig::default().with_concurrency(0).is_err());
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" a, b,,c "), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("X", "Yes").unwrap());
        assert!(!parse_bool("X", "0").unwrap());
        assert!(parse_bool("X", "maybe").is_err());
    }
}
