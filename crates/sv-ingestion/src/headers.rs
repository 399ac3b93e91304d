//! Request headers.

use crate::error::IngestionError;
use crate::session::Session;
use crate::signer::Signature;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

/// Headers for one signed request.
///
/// Any header the rules list in `remove_headers` is left out.
pub fn build_headers(
    session: &Session,
    signature: &Signature,
    referer: &str,
) -> Result<HeaderMap, IngestionError> {
    let credentials = session.credentials();
    let cookie = format!(
        "sess={}; auth_id={}",
        credentials.session_token, credentials.user_id
    );

    let pairs: [(&'static str, &str); 10] = [
        ("accept", "application/json, text/plain, */*"),
        ("accept-encoding", "gzip, deflate"),
        ("app-token", session.app_token()),
        ("user-agent", &credentials.user_agent),
        ("x-bc", &credentials.x_bc),
        ("user-id", &credentials.user_id),
        ("cookie", &cookie),
        ("referer", referer),
        ("sign", &signature.sign),
        ("time", &signature.time),
    ];

    let mut headers = HeaderMap::with_capacity(pairs.len());
    for (name, value) in pairs {
        if session.rules().removes_header(name) {
            continue;
        }
        let value = HeaderValue::from_str(value)
            .map_err(|_| IngestionError::Config(format!("invalid value for header `{name}`")))?;
        headers.insert(HeaderName::from_static(name), value);
    }
    Ok(headers)
}
