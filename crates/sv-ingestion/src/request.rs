//! Fetch requests and endpoint paths.

use sv_types::Category;

/// One logical fetch: a category, its endpoint path, and an optional age bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub category: Category,

    /// Endpoint path below the API prefix, e.g. `/users/42/posts`.
    pub path: String,

    /// Only items published after this unix time (seconds).
    /// Ignored by categories that do not accept an age filter.
    pub after_publish_time: Option<i64>,
}

impl FetchRequest {
    pub fn new(category: Category, path: impl Into<String>) -> Self {
        Self {
            category,
            path: path.into(),
            after_publish_time: None,
        }
    }

    /// Set the publish-time lower bound (builder pattern).
    pub fn with_after(mut self, unix_secs: Option<i64>) -> Self {
        self.after_publish_time = unix_secs;
        self
    }

    /// Profile record by username or id.
    pub fn user_info(profile: &str) -> Self {
        Self::new(Category::UserInfo, format!("/users/{profile}"))
    }

    /// Active subscriptions of the logged-in account.
    pub fn subscriptions() -> Self {
        Self::new(Category::Subscriptions, "/subscriptions/subscribes")
    }

    /// Purchased content of the logged-in account.
    pub fn purchased() -> Self {
        Self::new(Category::Purchased, "/posts/paid")
    }

    /// The request for `category` of the profile with numeric id `user_id`.
    pub fn for_profile(category: Category, user_id: &str) -> Self {
        match category {
            Category::Posts => Self::new(category, format!("/users/{user_id}/posts")),
            Category::Stories => Self::new(category, format!("/users/{user_id}/stories")),
            Category::Archived => Self::new(category, format!("/users/{user_id}/posts/archived")),
            Category::Messages => Self::new(category, format!("/chats/{user_id}/messages")),
            Category::UserInfo => Self::user_info(user_id),
            Category::Purchased => Self::purchased(),
            Category::Subscriptions => Self::subscriptions(),
        }
    }

    /// The `afterPublishTime` value to send, if any.
    pub(crate) fn after_param(&self) -> Option<String> {
        self.after_publish_time
            .filter(|_| self.category.accepts_age_filter())
            .map(|secs| format!("{secs}.000000"))
    }
}
