//! Typed views over profile and subscription records.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A creator profile as returned by the user-info endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,

    pub username: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub posts_count: u64,

    #[serde(default)]
    pub photos_count: u64,

    #[serde(default)]
    pub videos_count: u64,

    #[serde(default)]
    pub audios_count: u64,

    #[serde(default)]
    pub archived_posts_count: u64,
}

/// One active subscription of the logged-in account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(deserialize_with = "id_as_string")]
    pub id: String,

    pub username: String,

    #[serde(default)]
    pub name: Option<String>,

    /// Price paid per period; absent for free profiles.
    #[serde(default)]
    pub subscribe_price: Option<Decimal>,
}

impl Subscription {
    /// Whether the subscription costs nothing.
    pub fn is_free(&self) -> bool {
        self.subscribe_price.map_or(true, |p| p.is_zero())
    }
}

fn id_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected id to be a string or number, got {other}"
        ))),
    }
}
