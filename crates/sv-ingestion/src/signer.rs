//! Request signing.
//!
//! Every API call carries a `sign` header derived from:
//! 1. the rules' static secret,
//! 2. the unix time of the request (also sent as the `time` header),
//! 3. the request path including its query string,
//! 4. the account's user id.
//!
//! These are joined with newlines and hashed with SHA-1. A checksum is then
//! computed by summing the ASCII values of selected hex characters of the
//! digest plus a constant, and both are rendered through the rules' header
//! template.
//!
//! Signing is a pure function of its inputs; the caller supplies the clock.

use crate::error::SignError;
use sha1::{Digest, Sha1};
use std::fmt::Write as _;
use sv_types::{Credentials, QueryParams, SigningRules};

/// Path prefix of every API endpoint; part of the signed path.
pub const API_PREFIX: &str = "/api2/v2";

/// The `sign` and `time` header values for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub sign: String,
    pub time: String,
}

/// The path as signed: API prefix, endpoint path and, if any, the raw query.
///
/// The query is appended in the caller's order, unencoded; an empty query
/// adds nothing (no dangling `?`).
pub fn canonical_path(path: &str, query: &QueryParams) -> String {
    if query.is_empty() {
        format!("{API_PREFIX}{path}")
    } else {
        format!("{API_PREFIX}{path}?{}", query.to_query_string())
    }
}

/// Lowercase hex SHA-1 of the UTF-8 message.
pub fn sha1_hex(message: &str) -> String {
    let digest = Sha1::digest(message.as_bytes());
    let mut hex = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        // Writing to a String cannot fail.
        let _ = write!(hex, "{byte:02x}");
    }
    hex
}

/// Sum of the ASCII values at `indexes` in `digest`, plus `constant`.
///
/// Indexes may repeat. An index past the end of the digest is an error; it
/// never wraps around. Neither does the sum.
pub fn checksum(digest: &str, indexes: &[usize], constant: i64) -> Result<i64, SignError> {
    let bytes = digest.as_bytes();
    indexes.iter().try_fold(constant, |acc, &index| {
        let b = bytes.get(index).ok_or(SignError::IndexOutOfRange {
            index,
            len: bytes.len(),
        })?;
        acc.checked_add(i64::from(*b)).ok_or(SignError::ChecksumOverflow)
    })
}

/// Compute the signature for a request issued at `now_unix_secs`.
///
/// # Errors
///
/// [`SignError::NonAscii`] if the user id, secret or path contain non-ASCII
/// characters, [`SignError::IndexOutOfRange`] if a checksum index does not
/// fit the digest, [`SignError::ChecksumOverflow`] if the sum leaves `i64`.
pub fn sign(
    path: &str,
    query: &QueryParams,
    credentials: &Credentials,
    rules: &SigningRules,
    now_unix_secs: i64,
) -> Result<Signature, SignError> {
    if !credentials.user_id.is_ascii() {
        return Err(SignError::NonAscii("user_id"));
    }
    if !rules.static_param().is_ascii() {
        return Err(SignError::NonAscii("static_param"));
    }
    let canonical = canonical_path(path, query);
    if !canonical.is_ascii() {
        return Err(SignError::NonAscii("request path"));
    }

    let time = now_unix_secs.to_string();
    let message = [
        rules.static_param(),
        time.as_str(),
        canonical.as_str(),
        credentials.user_id.as_str(),
    ]
    .join("\n");

    let digest = sha1_hex(&message);
    let checksum = checksum(&digest, rules.checksum_indexes(), rules.checksum_constant())?;
    let sign = rules.template().render(&digest, checksum.unsigned_abs());

    Ok(Signature { sign, time })
}
