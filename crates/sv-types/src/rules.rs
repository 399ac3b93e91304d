//! Signing rules ("dynamic rules").
//!
//! The platform rotates the recipe for its `sign` header regularly, so the
//! recipe is data, not code. [`SigningRules`] is the validated form: a value
//! that exists has already passed every check, and the signer can use it
//! without re-validating.
//!
//! # JSON shape
//!
//! ```json
//! {
//!   "revision": "202502031617-af2daeeb87",
//!   "static_param": "r0COhCenVY6tUCrcnkbwz727f1m0UHsv",
//!   "format": "36587:{}:{:x}:67a0ec50",
//!   "checksum_indexes": [1, 1, 2, 5],
//!   "checksum_constant": 118,
//!   "app_token": "33d57ade8c02dbc5a333db99ff9ae26a",
//!   "remove_headers": ["user_id"]
//! }
//! ```
//!
//! Older rule sets omit `format` and carry `prefix`/`start` and
//! `suffix`/`end` instead; the template is then `prefix:{}:{:x}:suffix`.

use crate::credentials::is_header_safe;
use crate::TypeError;
use serde::Deserialize;

/// Length of a lowercase hex SHA-1 digest.
pub const DIGEST_HEX_LEN: usize = 40;

const DIGEST_SLOT: &str = "{}";
const CHECKSUM_SLOT: &str = "{:x}";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Digest,
    Checksum,
}

/// Parsed `format` string with one digest slot and one checksum slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl HeaderTemplate {
    /// Parse a template such as `"36587:{}:{:x}:67a0ec50"`.
    ///
    /// `{}` receives the hex digest and `{:x}` the checksum in lowercase hex.
    /// Exactly one of each is required and no other braces are allowed.
    pub fn parse(source: &str) -> Result<Self, TypeError> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = source;

        while let Some(c) = rest.chars().next() {
            let slot = if rest.starts_with(DIGEST_SLOT) {
                Some((Segment::Digest, DIGEST_SLOT.len()))
            } else if rest.starts_with(CHECKSUM_SLOT) {
                Some((Segment::Checksum, CHECKSUM_SLOT.len()))
            } else if c == '{' || c == '}' {
                return Err(TypeError::InvalidRules(format!(
                    "unsupported placeholder in format {source:?}"
                )));
            } else {
                None
            };

            match slot {
                Some((segment, len)) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(segment);
                    rest = &rest[len..];
                }
                None => {
                    literal.push(c);
                    rest = &rest[c.len_utf8()..];
                }
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        let digests = segments.iter().filter(|s| **s == Segment::Digest).count();
        let checksums = segments.iter().filter(|s| **s == Segment::Checksum).count();
        if digests != 1 || checksums != 1 {
            return Err(TypeError::InvalidRules(format!(
                "format {source:?} needs exactly one {{}} and one {{:x}} placeholder"
            )));
        }
        if !is_header_safe(source) {
            return Err(TypeError::InvalidRules(format!(
                "format {source:?} is not printable ASCII"
            )));
        }

        Ok(Self {
            source: source.to_string(),
            segments,
        })
    }

    /// Render the header value.
    pub fn render(&self, digest: &str, checksum: u64) -> String {
        let mut out = String::with_capacity(self.source.len() + DIGEST_HEX_LEN + 16);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Digest => out.push_str(digest),
                Segment::Checksum => out.push_str(&format!("{checksum:x}")),
            }
        }
        out
    }

    /// The template as written in the rules.
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

/// Validated signing recipe.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawSigningRules")]
pub struct SigningRules {
    revision: Option<String>,
    static_param: String,
    checksum_indexes: Vec<usize>,
    checksum_constant: i64,
    template: HeaderTemplate,
    remove_headers: Vec<String>,
    app_token: Option<String>,
}

impl SigningRules {
    /// Build and validate a rule set.
    pub fn new(
        static_param: impl Into<String>,
        checksum_indexes: Vec<usize>,
        checksum_constant: i64,
        template: HeaderTemplate,
    ) -> Result<Self, TypeError> {
        let static_param = static_param.into();
        if static_param.is_empty() {
            return Err(TypeError::InvalidRules("static_param is empty".into()));
        }
        if !static_param.is_ascii() {
            return Err(TypeError::InvalidRules(
                "static_param contains non-ASCII characters".into(),
            ));
        }
        if checksum_indexes.is_empty() {
            return Err(TypeError::InvalidRules("checksum_indexes is empty".into()));
        }
        if let Some(bad) = checksum_indexes.iter().find(|&&i| i >= DIGEST_HEX_LEN) {
            return Err(TypeError::InvalidRules(format!(
                "checksum index {bad} is outside the {DIGEST_HEX_LEN}-character digest"
            )));
        }
        let headroom = i64::try_from(checksum_indexes.len())
            .ok()
            .and_then(|n| n.checked_mul(i64::from(u8::MAX)));
        if headroom
            .and_then(|h| checksum_constant.checked_add(h))
            .is_none()
        {
            return Err(TypeError::InvalidRules(format!(
                "checksum_constant {checksum_constant} overflows the checksum"
            )));
        }

        Ok(Self {
            revision: None,
            static_param,
            checksum_indexes,
            checksum_constant,
            template,
            remove_headers: Vec::new(),
            app_token: None,
        })
    }

    /// Parse and validate rules from their JSON form.
    pub fn from_json(json: &str) -> Result<Self, TypeError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Set the revision identifier (builder pattern).
    pub fn with_revision(mut self, revision: impl Into<String>) -> Self {
        self.revision = Some(revision.into());
        self
    }

    /// Set the headers to strip from outgoing requests (builder pattern).
    pub fn with_remove_headers(mut self, headers: Vec<String>) -> Self {
        self.remove_headers = headers;
        self
    }

    /// Set the application token shipped with these rules (builder pattern).
    pub fn with_app_token(mut self, app_token: impl Into<String>) -> Self {
        self.app_token = Some(app_token.into());
        self
    }

    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }

    pub fn static_param(&self) -> &str {
        &self.static_param
    }

    pub fn checksum_indexes(&self) -> &[usize] {
        &self.checksum_indexes
    }

    pub fn checksum_constant(&self) -> i64 {
        self.checksum_constant
    }

    pub fn template(&self) -> &HeaderTemplate {
        &self.template
    }

    pub fn app_token(&self) -> Option<&str> {
        self.app_token.as_deref()
    }

    /// Whether a header must be left out of requests.
    ///
    /// Rule sets name headers loosely (`user_id` for `user-id`), so the
    /// comparison ignores case and treats `_` as `-`.
    pub fn removes_header(&self, name: &str) -> bool {
        let wanted = normalize_header(name);
        self.remove_headers
            .iter()
            .any(|h| normalize_header(h) == wanted)
    }
}

fn normalize_header(name: &str) -> String {
    name.trim().to_ascii_lowercase().replace('_', "-")
}

/// Wire form of the rules, before validation.
///
/// `prefix`/`start` and `suffix`/`end` are separate fields rather than serde
/// aliases because published rule files carry both spellings at once.
#[derive(Debug, Deserialize)]
struct RawSigningRules {
    #[serde(default)]
    revision: Option<String>,
    static_param: String,
    checksum_indexes: Vec<i64>,
    checksum_constant: i64,
    #[serde(default)]
    format: Option<String>,
    #[serde(default)]
    prefix: Option<String>,
    #[serde(default)]
    start: Option<String>,
    #[serde(default)]
    suffix: Option<String>,
    #[serde(default)]
    end: Option<String>,
    #[serde(default)]
    remove_headers: Vec<String>,
    #[serde(default)]
    app_token: Option<String>,
}

impl TryFrom<RawSigningRules> for SigningRules {
    type Error = TypeError;

    fn try_from(raw: RawSigningRules) -> Result<Self, Self::Error> {
        let format = match raw.format {
            Some(format) => format,
            None => {
                let prefix = raw.prefix.or(raw.start);
                let suffix = raw.suffix.or(raw.end);
                match (prefix, suffix) {
                    (Some(prefix), Some(suffix)) => format!("{prefix}:{{}}:{{:x}}:{suffix}"),
                    _ => {
                        return Err(TypeError::InvalidRules(
                            "rules need either format or prefix/suffix".into(),
                        ))
                    }
                }
            }
        };
        let template = HeaderTemplate::parse(&format)?;

        let indexes = raw
            .checksum_indexes
            .into_iter()
            .map(|i| {
                usize::try_from(i).map_err(|_| {
                    TypeError::InvalidRules(format!("checksum index {i} is negative"))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut rules =
            SigningRules::new(raw.static_param, indexes, raw.checksum_constant, template)?
                .with_remove_headers(raw.remove_headers);
        if let Some(revision) = raw.revision {
            rules = rules.with_revision(revision);
        }
        if let Some(token) = raw.app_token.filter(|t| !t.is_empty()) {
            if !is_header_safe(&token) {
                return Err(TypeError::InvalidRules(
                    "app_token is not printable ASCII".into(),
                ));
            }
            rules = rules.with_app_token(token);
        }
        Ok(rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PUBLISHED: &str = r#"{
        "end": "67a0ec50",
        "start": "36587",
        "format": "36587:{}:{:x}:67a0ec50",
        "prefix": "36587",
        "suffix": "67a0ec50",
        "revision": "202502031617-af2daeeb87",
        "app_token": "33d57ade8c02dbc5a333db99ff9ae26a",
        "static_param": "r0COhCenVY6tUCrcnkbwz727f1m0UHsv",
        "remove_headers": ["user_id"],
        "checksum_indexes": [1, 1, 1, 2, 2, 5, 5, 6, 39],
        "checksum_constant": 118
    }"#;

    #[test]
    fn test_parse_published_rules() {
        let rules = SigningRules::from_json(PUBLISHED).unwrap();
        assert_eq!(rules.revision(), Some("202502031617-af2daeeb87"));
        assert_eq!(rules.checksum_constant(), 118);
        assert_eq!(rules.checksum_indexes().len(), 9);
        assert_eq!(rules.template().as_str(), "36587:{}:{:x}:67a0ec50");
        assert_eq!(rules.app_token(), Some("33d57ade8c02dbc5a333db99ff9ae26a"));
        assert!(rules.removes_header("user-id"));
        assert!(rules.removes_header("USER_ID"));
        assert!(!rules.removes_header("sign"));
    }

    #[test]
    fn test_template_from_prefix_suffix() {
        let json = r#"{
            "static_param": "x",
            "checksum_indexes": [0],
            "checksum_constant": 0,
            "start": "111",
            "end": "222"
        }"#;
        let rules = SigningRules::from_json(json).unwrap();
        assert_eq!(rules.template().as_str(), "111:{}:{:x}:222");
    }

    #[test]
    fn test_missing_format_rejected() {
        let json = r#"{"static_param":"x","checksum_indexes":[0],"checksum_constant":0}"#;
        assert!(SigningRules::from_json(json).is_err());
    }

    #[test]
    fn test_out_of_range_index_rejected() {
        let json = r#"{
            "static_param": "x",
            "checksum_indexes": [0, 40],
            "checksum_constant": 0,
            "format": "{}:{:x}"
        }"#;
        let err = SigningRules::from_json(json).unwrap_err();
        assert!(err.to_string().contains("40"));
    }

    #[test]
    fn test_negative_index_rejected() {
        let json = r#"{
            "static_param": "x",
            "checksum_indexes": [-1],
            "checksum_constant": 0,
            "format": "{}:{:x}"
        }"#;
        assert!(SigningRules::from_json(json).is_err());
    }

    #[test]
    fn test_overflowing_constant_rejected() {
        let json = r#"{
            "static_param": "x",
            "checksum_indexes": [0, 1],
            "checksum_constant": 9223372036854775807,
            "format": "{}:{:x}"
        }"#;
        let err = SigningRules::from_json(json).unwrap_err();
        assert!(err.to_string().contains("overflows"));

        let template = HeaderTemplate::parse("{}:{:x}").unwrap();
        assert!(SigningRules::new("x", vec![0], i64::MAX - 255, template.clone()).is_ok());
        assert!(SigningRules::new("x", vec![0], i64::MIN, template).is_ok());
    }

    #[test]
    fn test_empty_indexes_rejected() {
        let template = HeaderTemplate::parse("{}:{:x}").unwrap();
        assert!(SigningRules::new("x", vec![], 0, template).is_err());
    }

    #[test]
    fn test_template_render() {
        let template = HeaderTemplate::parse("36587:{}:{:x}:67a0ec50").unwrap();
        assert_eq!(template.render("abc", 255), "36587:abc:ff:67a0ec50");
    }

    #[test]
    fn test_template_slot_order_is_free() {
        let template = HeaderTemplate::parse("{:x}|{}").unwrap();
        assert_eq!(template.render("d", 16), "10|d");
    }

    #[test]
    fn test_template_rejects_bad_placeholders() {
        assert!(HeaderTemplate::parse("{}:{}:{:x}").is_err());
        assert!(HeaderTemplate::parse("{}").is_err());
        assert!(HeaderTemplate::parse("{}:{:X}").is_err());
        assert!(HeaderTemplate::parse("{}:{:x}:{0}").is_err());
    }
}
