//! Configuration for the ingestion layer.
//!
//! # Environment Variables
//!
//! - `SV_BASE_URL`: platform origin (default: `https://onlyfans.com`)
//! - `SV_PAGE_LIMIT`: items requested per page (default: 50)
//! - `SV_TIMEOUT_SECS`: whole-request timeout (default: 30)
//! - `SV_CONNECT_TIMEOUT_SECS`: connect timeout (default: 10)
//! - `SV_PARTIAL_POLICY`: `keep` or `discard` (default: keep)

use crate::error::IngestionError;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Platform origin. The API lives under [`crate::signer::API_PREFIX`].
pub const DEFAULT_BASE_URL: &str = "https://onlyfans.com";

/// Items requested per page.
pub const DEFAULT_PAGE_LIMIT: usize = 50;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// What to do with pages already fetched when a later page fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PartialPolicy {
    /// Return the accumulated items tagged with the error.
    #[default]
    Keep,
    /// Drop the accumulated items and return only the error.
    Discard,
}

impl FromStr for PartialPolicy {
    type Err = IngestionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" => Ok(PartialPolicy::Keep),
            "discard" => Ok(PartialPolicy::Discard),
            other => Err(IngestionError::Config(format!(
                "invalid partial policy `{other}`; expected keep|discard"
            ))),
        }
    }
}

/// Settings for [`crate::ApiClient`].
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Platform origin, without the API prefix.
    pub base_url: Url,

    /// Items requested per page; also the short-page threshold.
    pub page_limit: usize,

    /// Timeout applied to every request, start to finish.
    pub timeout: Duration,

    /// Timeout for establishing a connection.
    pub connect_timeout: Duration,

    /// Handling of mid-pagination application errors.
    pub partial_policy: PartialPolicy,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("default base URL is valid"),
            page_limit: DEFAULT_PAGE_LIMIT,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            partial_policy: PartialPolicy::default(),
        }
    }
}

impl ApiConfig {
    /// Config pointing at `base_url`, other settings at their defaults.
    pub fn new(base_url: &str) -> Result<Self, IngestionError> {
        Ok(Self::default().with_base_url(parse_base_url(base_url)?))
    }

    /// Load settings from `SV_*` environment variables.
    ///
    /// Unset variables fall back to defaults; set but malformed ones are
    /// errors, so a typo never silently reverts to a default.
    pub fn from_env() -> Result<Self, IngestionError> {
        let mut config = Self::default();

        if let Ok(url) = env::var("SV_BASE_URL") {
            config.base_url = parse_base_url(&url)?;
        }
        if let Some(limit) = parse_env::<usize>("SV_PAGE_LIMIT")? {
            config = config.with_page_limit(limit)?;
        }
        if let Some(secs) = parse_env::<u64>("SV_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_env::<u64>("SV_CONNECT_TIMEOUT_SECS")? {
            config.connect_timeout = Duration::from_secs(secs);
        }
        if let Ok(policy) = env::var("SV_PARTIAL_POLICY") {
            config.partial_policy = policy.parse()?;
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = base_url;
        self
    }

    /// Set the page size. Zero would never satisfy the short-page test.
    pub fn with_page_limit(mut self, page_limit: usize) -> Result<Self, IngestionError> {
        if page_limit == 0 {
            return Err(IngestionError::Config("page limit must be positive".into()));
        }
        self.page_limit = page_limit;
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_partial_policy(mut self, policy: PartialPolicy) -> Self {
        self.partial_policy = policy;
        self
    }

    /// Origin without a trailing slash, used to build request URLs.
    pub(crate) fn origin(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }
}

fn parse_base_url(raw: &str) -> Result<Url, IngestionError> {
    Url::parse(raw).map_err(|e| IngestionError::Config(format!("invalid base URL {raw:?}: {e}")))
}

fn parse_env<T: FromStr>(name: &str) -> Result<Option<T>, IngestionError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| IngestionError::Config(format!("{name}={raw:?} is not a valid value"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.page_limit, 50);
        assert_eq!(config.partial_policy, PartialPolicy::Keep);
        assert_eq!(config.origin(), "https://onlyfans.com");
    }

    #[test]
    fn test_zero_page_limit_rejected() {
        assert!(ApiConfig::default().with_page_limit(0).is_err());
    }

    #[test]
    fn test_partial_policy_parse() {
        assert_eq!("Keep".parse::<PartialPolicy>().unwrap(), PartialPolicy::Keep);
        assert_eq!(
            "discard".parse::<PartialPolicy>().unwrap(),
            PartialPolicy::Discard
        );
        assert!("maybe".parse::<PartialPolicy>().is_err());
    }

    #[test]
    fn test_new_rejects_bad_url() {
        assert!(ApiConfig::new("not a url").is_err());
    }

    #[test]
    fn test_origin_trims_slash() {
        let config = ApiConfig::new("http://127.0.0.1:8080/").unwrap();
        assert_eq!(config.origin(), "http://127.0.0.1:8080");
    }
}
