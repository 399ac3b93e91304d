//! Session credentials.

use crate::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The identity of the logged-in account, sent with every request.
///
/// Loaded once from configuration and never mutated afterwards. All fields
/// end up in HTTP headers, so they must be printable ASCII.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Numeric account id, also part of the signed message.
    pub user_id: String,

    /// Browser user agent the session was created with.
    pub user_agent: String,

    /// Browser fingerprint value sent as `x-bc`.
    pub x_bc: String,

    /// Session cookie value.
    #[serde(alias = "sess")]
    pub session_token: String,

    /// Application token. Optional because the signing rules usually carry it.
    #[serde(default)]
    pub app_token: Option<String>,
}

impl Credentials {
    /// Create credentials and validate them.
    pub fn new(
        user_id: impl Into<String>,
        user_agent: impl Into<String>,
        x_bc: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Result<Self, TypeError> {
        let credentials = Self {
            user_id: user_id.into(),
            user_agent: user_agent.into(),
            x_bc: x_bc.into(),
            session_token: session_token.into(),
            app_token: None,
        };
        credentials.validate()?;
        Ok(credentials)
    }

    /// Set the application token (builder pattern).
    pub fn with_app_token(mut self, app_token: impl Into<String>) -> Self {
        self.app_token = Some(app_token.into());
        self
    }

    /// Parse and validate credentials from JSON.
    pub fn from_json(json: &str) -> Result<Self, TypeError> {
        let credentials: Credentials = serde_json::from_str(json)?;
        credentials.validate()?;
        Ok(credentials)
    }

    /// Check that every field is present and header-safe.
    pub fn validate(&self) -> Result<(), TypeError> {
        check_field("user_id", &self.user_id)?;
        check_field("user_agent", &self.user_agent)?;
        check_field("x_bc", &self.x_bc)?;
        check_field("session_token", &self.session_token)?;
        if let Some(token) = &self.app_token {
            check_field("app_token", token)?;
        }
        Ok(())
    }
}

// Session values never reach logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user_id", &self.user_id)
            .field("user_agent", &self.user_agent)
            .field("x_bc", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("app_token", &self.app_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn check_field(name: &str, value: &str) -> Result<(), TypeError> {
    if value.trim().is_empty() {
        return Err(TypeError::InvalidCredentials(format!("{name} is missing")));
    }
    if !is_header_safe(value) {
        return Err(TypeError::InvalidCredentials(format!(
            "{name} contains non-ASCII or control characters"
        )));
    }
    Ok(())
}

/// Printable ASCII only (space through tilde).
pub(crate) fn is_header_safe(value: &str) -> bool {
    value.bytes().all(|b| (b' '..=b'~').contains(&b))
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "user_id": "123456",
        "user_agent": "Mozilla/5.0",
        "x_bc": "abcdef0123",
        "session_token": "s3ss10n"
    }"#;

    #[test]
    fn test_parse_valid() {
        let creds = Credentials::from_json(VALID).unwrap();
        assert_eq!(creds.user_id, "123456");
        assert!(creds.app_token.is_none());
    }

    #[test]
    fn test_sess_alias() {
        let json = r#"{"user_id":"1","user_agent":"ua","x_bc":"bc","sess":"tok"}"#;
        let creds = Credentials::from_json(json).unwrap();
        assert_eq!(creds.session_token, "tok");
    }

    #[test]
    fn test_missing_field_rejected() {
        let json = r#"{"user_id":"1","user_agent":"ua","x_bc":"bc"}"#;
        assert!(Credentials::from_json(json).is_err());
    }

    #[test]
    fn test_empty_field_rejected() {
        let result = Credentials::new("", "ua", "bc", "tok");
        assert!(matches!(result, Err(TypeError::InvalidCredentials(_))));
    }

    #[test]
    fn test_non_ascii_rejected() {
        let result = Credentials::new("1", "Mozílla", "bc", "tok");
        assert!(matches!(result, Err(TypeError::InvalidCredentials(_))));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let creds = Credentials::new("1", "ua", "bc", "supersecret")
            .unwrap()
            .with_app_token("apptok");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("supersecret"));
        assert!(!debug.contains("apptok"));
    }
}
