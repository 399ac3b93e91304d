//! Content categories.
//!
//! Each [`Category`] maps onto exactly one [`Pagination`] class. The fetcher
//! dispatches on the class, never on the category name, so adding a category
//! only means picking its class here.

use crate::TypeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A content category exposed by the platform API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    /// Timeline posts.
    Posts,
    /// Stories.
    Stories,
    /// Direct messages with a profile.
    Messages,
    /// Purchased (paid) content.
    Purchased,
    /// Active subscriptions of the logged-in account.
    Subscriptions,
    /// Archived posts.
    Archived,
    /// A single profile record.
    UserInfo,
}

/// How a category advances from one page to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pagination {
    /// Ordered by publish time; continue after the last item's precise time.
    TimeWindowed,
    /// Continue at `offset + page length`.
    Offset,
    /// Continue from the last message id; the server reports `hasMore`.
    CursorById,
    /// One request, no continuation.
    SingleShot,
}

impl Category {
    /// Every category, in the order the archiver walks them.
    pub const ALL: [Category; 7] = [
        Category::UserInfo,
        Category::Subscriptions,
        Category::Posts,
        Category::Stories,
        Category::Messages,
        Category::Archived,
        Category::Purchased,
    ];

    /// The wire/config name of this category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Posts => "posts",
            Category::Stories => "stories",
            Category::Messages => "messages",
            Category::Purchased => "purchased",
            Category::Subscriptions => "subscriptions",
            Category::Archived => "archived",
            Category::UserInfo => "user-info",
        }
    }

    /// The pagination class used for this category.
    pub fn pagination(&self) -> Pagination {
        match self {
            Category::Posts | Category::Stories | Category::Archived => Pagination::TimeWindowed,
            Category::Purchased | Category::Subscriptions => Pagination::Offset,
            Category::Messages => Pagination::CursorById,
            Category::UserInfo => Pagination::SingleShot,
        }
    }

    /// Whether an `afterPublishTime` lower bound applies.
    ///
    /// Messages can only be limited by offset or last message id, and the
    /// account-wide lists ignore it.
    #[inline]
    pub fn accepts_age_filter(&self) -> bool {
        self.pagination() == Pagination::TimeWindowed
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "posts" => Ok(Category::Posts),
            "stories" => Ok(Category::Stories),
            "messages" => Ok(Category::Messages),
            "purchased" => Ok(Category::Purchased),
            "subscriptions" => Ok(Category::Subscriptions),
            "archived" => Ok(Category::Archived),
            "user-info" | "user_info" | "userinfo" => Ok(Category::UserInfo),
            other => Err(TypeError::InvalidCategory(other.to_string())),
        }
    }
}
