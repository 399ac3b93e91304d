//! Per-class pagination strategies.
//!
//! Each [`Pagination`] class decides three things: the initial query, how
//! the continuation parameter advances after a page, and when to stop.
//!
//! | class        | continuation       | advance                    | stop when                        |
//! |--------------|--------------------|----------------------------|----------------------------------|
//! | TimeWindowed | `afterPublishTime` | last item `postedAtPrecise`| page shorter than limit          |
//! | Offset       | `offset`           | `+= page length`           | page shorter than limit          |
//! | CursorById   | `id`               | last item id               | `hasMore == false` or short page |
//! | SingleShot   | none               | none                       | always                           |

use sv_types::{Category, Item, Pagination, QueryParams};

/// Continuation state of one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    Offset(usize),
    AfterPublishTime(String),
    LastMessageId(String),
}

impl PageCursor {
    /// Write this cursor into the query, replacing any previous value.
    pub fn apply(&self, params: &mut QueryParams) {
        match self {
            PageCursor::Offset(offset) => params.set("offset", offset.to_string()),
            PageCursor::AfterPublishTime(time) => params.set("afterPublishTime", time.clone()),
            PageCursor::LastMessageId(id) => params.set("id", id.clone()),
        }
    }
}

/// One decoded result page.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<Item>,
    /// The server's `hasMore` flag, when the response carried one.
    pub has_more: Option<bool>,
}

/// What to do after a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Continue(PageCursor),
    Done,
    /// More pages may exist but the cursor cannot advance.
    Stuck(&'static str),
}

/// Query parameters for the first page of `category`.
pub fn initial_params(category: Category, limit: usize, after: Option<&str>) -> QueryParams {
    let mut params = QueryParams::new();
    match category.pagination() {
        Pagination::TimeWindowed => {
            params.set("limit", limit.to_string());
            params.set("order", "publish_date_asc");
            if let Some(after) = after {
                params.set("afterPublishTime", after);
            }
        }
        Pagination::Offset => {
            params.set("limit", limit.to_string());
            params.set("offset", "0");
            if category == Category::Subscriptions {
                params.set("type", "active");
            }
        }
        Pagination::CursorById => {
            params.set("limit", limit.to_string());
            params.set("order", "desc");
        }
        Pagination::SingleShot => {}
    }
    params
}

/// Decide the next step after receiving `page`.
///
/// `current` is the cursor that produced `page` (`None` for the first page).
pub fn next_step(
    category: Category,
    page: &Page,
    limit: usize,
    current: Option<&PageCursor>,
) -> Step {
    let short = page.items.len() < limit;
    let next = match category.pagination() {
        Pagination::SingleShot => return Step::Done,
        Pagination::TimeWindowed => {
            if short {
                return Step::Done;
            }
            match page.items.last().and_then(Item::posted_at_precise) {
                Some(time) => PageCursor::AfterPublishTime(time),
                None => return Step::Stuck("last item has no postedAtPrecise"),
            }
        }
        Pagination::Offset => {
            if short {
                return Step::Done;
            }
            let offset = match current {
                Some(PageCursor::Offset(offset)) => *offset,
                _ => 0,
            };
            PageCursor::Offset(offset + page.items.len())
        }
        Pagination::CursorById => {
            if short || page.has_more == Some(false) {
                return Step::Done;
            }
            match page.items.last().and_then(Item::id) {
                Some(id) => PageCursor::LastMessageId(id),
                None => return Step::Stuck("last message has no id"),
            }
        }
    };

    if current == Some(&next) {
        return Step::Stuck("continuation did not advance");
    }
    Step::Continue(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn posts(n: usize, start: usize) -> Vec<Item> {
        (start..start + n)
            .map(|i| {
                Item::from_value(json!({
                    "id": i,
                    "postedAtPrecise": format!("{}.000000", 1_700_000_000 + i)
                }))
                .unwrap()
            })
            .collect()
    }

    fn page(items: Vec<Item>, has_more: Option<bool>) -> Page {
        Page { items, has_more }
    }

    #[test]
    fn test_initial_params_time_windowed() {
        let params = initial_params(Category::Posts, 50, Some("1700000000.000000"));
        assert_eq!(
            params.to_query_string(),
            "limit=50&order=publish_date_asc&afterPublishTime=1700000000.000000"
        );
    }

    #[test]
    fn test_initial_params_subscriptions() {
        let params = initial_params(Category::Subscriptions, 50, None);
        assert_eq!(params.to_query_string(), "limit=50&offset=0&type=active");
    }

    #[test]
    fn test_initial_params_purchased_has_no_type() {
        let params = initial_params(Category::Purchased, 50, None);
        assert_eq!(params.to_query_string(), "limit=50&offset=0");
    }

    #[test]
    fn test_initial_params_messages() {
        let params = initial_params(Category::Messages, 50, None);
        assert_eq!(params.to_query_string(), "limit=50&order=desc");
    }

    #[test]
    fn test_initial_params_user_info_empty() {
        assert!(initial_params(Category::UserInfo, 50, None).is_empty());
    }

    #[test]
    fn test_short_page_is_done() {
        for category in [Category::Posts, Category::Purchased, Category::Messages] {
            let step = next_step(category, &page(posts(49, 0), Some(true)), 50, None);
            assert_eq!(step, Step::Done, "{category}");
        }
    }

    #[test]
    fn test_offset_advances_by_page_length() {
        let step = next_step(Category::Purchased, &page(posts(50, 0), None), 50, None);
        assert_eq!(step, Step::Continue(PageCursor::Offset(50)));

        let current = PageCursor::Offset(50);
        let step = next_step(
            Category::Purchased,
            &page(posts(50, 50), None),
            50,
            Some(&current),
        );
        assert_eq!(step, Step::Continue(PageCursor::Offset(100)));
    }

    #[test]
    fn test_time_windowed_continues_from_last_item() {
        let step = next_step(Category::Posts, &page(posts(50, 0), None), 50, None);
        assert_eq!(
            step,
            Step::Continue(PageCursor::AfterPublishTime("1700000049.000000".into()))
        );
    }

    #[test]
    fn test_messages_stop_on_has_more_false() {
        let step = next_step(Category::Messages, &page(posts(50, 0), Some(false)), 50, None);
        assert_eq!(step, Step::Done);
    }

    #[test]
    fn test_messages_continue_from_last_id() {
        let step = next_step(Category::Messages, &page(posts(50, 0), Some(true)), 50, None);
        assert_eq!(step, Step::Continue(PageCursor::LastMessageId("49".into())));
    }

    #[test]
    fn test_single_shot_always_done() {
        let step = next_step(Category::UserInfo, &page(posts(50, 0), None), 50, None);
        assert_eq!(step, Step::Done);
    }

    #[test]
    fn test_stalled_cursor_is_stuck() {
        let current = PageCursor::AfterPublishTime("1700000049.000000".into());
        let step = next_step(
            Category::Posts,
            &page(posts(50, 0), None),
            50,
            Some(&current),
        );
        assert!(matches!(step, Step::Stuck(_)));
    }

    #[test]
    fn test_missing_precise_time_is_stuck() {
        let items: Vec<Item> = (0..50)
            .map(|i| Item::from_value(json!({ "id": i })).unwrap())
            .collect();
        let step = next_step(Category::Stories, &page(items, None), 50, None);
        assert!(matches!(step, Step::Stuck(_)));
    }

    #[test]
    fn test_cursor_apply_replaces_value() {
        let mut params = initial_params(Category::Purchased, 50, None);
        PageCursor::Offset(50).apply(&mut params);
        assert_eq!(params.to_query_string(), "limit=50&offset=50");
    }
}
