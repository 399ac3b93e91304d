//! Typed views over fetched records.

use crate::error::ArchiverError;
use serde_json::Value;
use sv_types::{Item, ResultSet, Subscription, UserProfile};

/// The profile from a user-info result.
pub fn to_profile(result: &ResultSet) -> Result<UserProfile, ArchiverError> {
    if let ResultSet::Failed(error) = result {
        return Err(ArchiverError::Api(error.clone()));
    }
    let item = result
        .items()
        .first()
        .ok_or_else(|| ArchiverError::InvalidRecord("empty user-info response".into()))?;
    item.parse()
        .map_err(|e| ArchiverError::InvalidRecord(format!("user-info: {e}")))
}

/// Subscriptions from a subscriptions result, skipping unreadable records.
pub fn to_subscriptions(items: &[Item]) -> Vec<Subscription> {
    items
        .iter()
        .filter_map(|item| match item.parse::<Subscription>() {
            Ok(subscription) => Some(subscription),
            Err(e) => {
                tracing::warn!("Skipping unreadable subscription record: {}", e);
                None
            }
        })
        .collect()
}

/// Whether a purchased record belongs to the profile with `user_id`.
///
/// Purchases list the seller under `author` (posts) or `fromUser`
/// (messages). Records naming neither are kept.
pub fn is_from(item: &Item, user_id: &str) -> bool {
    let seller = ["author", "fromUser"]
        .iter()
        .find_map(|key| item.get(key)?.get("id").map(id_string));
    seller.map_or(true, |id| id == user_id)
}

fn id_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sv_types::ApiError;

    fn item(value: Value) -> Item {
        Item::from_value(value).unwrap()
    }

    #[test]
    fn test_to_profile() {
        let result = ResultSet::Complete {
            items: vec![item(json!({ "id": 42, "username": "alice", "postsCount": 3 }))],
            pages: 1,
        };
        let profile = to_profile(&result).unwrap();
        assert_eq!(profile.id, "42");
        assert_eq!(profile.posts_count, 3);
    }

    #[test]
    fn test_to_profile_failed() {
        let result = ResultSet::Failed(ApiError::new("User not found", None));
        assert!(matches!(to_profile(&result), Err(ArchiverError::Api(_))));
    }

    #[test]
    fn test_to_profile_empty() {
        let result = ResultSet::Complete {
            items: vec![],
            pages: 1,
        };
        assert!(matches!(
            to_profile(&result),
            Err(ArchiverError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_to_subscriptions_skips_bad_records() {
        let items = vec![
            item(json!({ "id": 1, "username": "alice" })),
            item(json!({ "id": 2 })),
        ];
        let subscriptions = to_subscriptions(&items);
        assert_eq!(subscriptions.len(), 1);
        assert_eq!(subscriptions[0].username, "alice");
    }

    #[test]
    fn test_is_from() {
        assert!(is_from(&item(json!({ "id": 1, "author": { "id": 42 } })), "42"));
        assert!(!is_from(&item(json!({ "id": 1, "author": { "id": 7 } })), "42"));
        assert!(is_from(&item(json!({ "id": 1, "fromUser": { "id": "42" } })), "42"));
        assert!(is_from(&item(json!({ "id": 1 })), "42"));
    }
}
