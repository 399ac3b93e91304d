//! Archiver runs against a mock data source.

use chrono::{TimeZone, Utc};
use serde_json::json;
use sv_archiver::{
    AgePolicy, Archiver, ArchiverConfig, ArchiverError, FetchStatus, ProfileSelection,
    StaticWatermarks,
};
use sv_ingestion::{ApiError, Category, MockSource};
use tokio_util::sync::CancellationToken;

fn named(names: &[&str]) -> ProfileSelection {
    ProfileSelection::Named(names.iter().map(|s| s.to_string()).collect())
}

fn user(id: u64, username: &str) -> serde_json::Value {
    json!({ "id": id, "username": username })
}

#[tokio::test]
async fn failing_profile_does_not_stop_the_next() {
    let source = MockSource::new()
        .with_transport_error("/users/alice", "connection reset")
        .with_items("/users/bob", vec![user(2, "bob")])
        .with_items(
            "/users/2/posts",
            vec![json!({ "id": 10 }), json!({ "id": 11 }), json!({ "id": 12 })],
        );
    let archiver = Archiver::new(source.clone(), ArchiverConfig::default());

    let report = archiver
        .run(&named(&["alice", "bob"]), AgePolicy::Unbounded, &CancellationToken::new())
        .await
        .unwrap();

    let alice = report.profile("alice").unwrap();
    assert!(alice.error.as_deref().unwrap().contains("connection reset"));
    assert!(alice.categories.is_empty());

    let bob = report.profile("bob").unwrap();
    assert!(bob.is_ok());
    assert_eq!(bob.user_id.as_deref(), Some("2"));
    assert_eq!(bob.category(Category::Posts).unwrap().items, 3);
    assert_eq!(report.failed_profiles(), vec!["alice"]);

    assert!(source
        .requested_paths()
        .contains(&"/chats/2/messages".to_string()));
}

#[tokio::test]
async fn failing_category_does_not_stop_the_next() {
    let source = MockSource::new()
        .with_items("/users/bob", vec![user(2, "bob")])
        .with_api_error("/users/2/posts", ApiError::new("Access denied", Some(403)))
        .with_transport_error("/users/2/stories", "timed out")
        .with_items("/chats/2/messages", vec![json!({ "id": 1 })]);
    let config = ArchiverConfig::default().with_only(&[
        Category::Posts,
        Category::Stories,
        Category::Messages,
    ]);
    let archiver = Archiver::new(source, config);

    let report = archiver
        .run(&named(&["bob"]), AgePolicy::Unbounded, &CancellationToken::new())
        .await
        .unwrap();

    let bob = report.profile("bob").unwrap();
    assert_eq!(bob.category(Category::Posts).unwrap().status, FetchStatus::Failed);
    assert_eq!(bob.category(Category::Stories).unwrap().status, FetchStatus::Error);
    assert_eq!(bob.category(Category::Messages).unwrap().items, 1);
    assert!(!bob.is_ok());
}

#[tokio::test]
async fn unknown_profile_is_recorded() {
    let source = MockSource::new()
        .with_api_error("/users/ghost", ApiError::new("User not found", None));
    let archiver = Archiver::new(source.clone(), ArchiverConfig::default());

    let report = archiver
        .run(&named(&["ghost"]), AgePolicy::Unbounded, &CancellationToken::new())
        .await
        .unwrap();

    let ghost = report.profile("ghost").unwrap();
    assert!(ghost.error.as_deref().unwrap().contains("User not found"));
    assert_eq!(source.requested_paths(), vec!["/users/ghost"]);
}

#[tokio::test]
async fn all_resolves_subscriptions_and_honours_skip_list() {
    let source = MockSource::new()
        .with_items(
            "/subscriptions/subscribes",
            vec![user(1, "alice"), user(2, "bob"), user(3, "carol")],
        )
        .with_items("/users/alice", vec![user(1, "alice")])
        .with_items("/users/carol", vec![user(3, "carol")]);
    let config = ArchiverConfig::default()
        .with_skip_accounts(vec!["Bob".into()])
        .with_only(&[Category::Posts]);
    let archiver = Archiver::new(source.clone(), config);

    let report = archiver
        .run(&ProfileSelection::All, AgePolicy::Unbounded, &CancellationToken::new())
        .await
        .unwrap();

    let names: Vec<_> = report.profiles.iter().map(|p| p.profile.as_str()).collect();
    assert_eq!(names, vec!["alice", "carol"]);
    assert_eq!(report.skipped, vec!["bob"]);
    assert!(!source.requested_paths().iter().any(|p| p.contains("bob")));
}

#[tokio::test]
async fn refused_subscription_list_fails_the_run() {
    let source = MockSource::new().with_api_error(
        "/subscriptions/subscribes",
        ApiError::new("Please refresh the page", Some(401)),
    );
    let archiver = Archiver::new(source, ArchiverConfig::default());

    let result = archiver
        .run(&ProfileSelection::All, AgePolicy::Unbounded, &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(ArchiverError::Api(_))));
}

#[tokio::test]
async fn only_enabled_categories_are_fetched_in_order() {
    let source = MockSource::new().with_items("/users/bob", vec![user(2, "bob")]);
    let config = ArchiverConfig::default().with_only(&[Category::Archived, Category::Stories]);
    let archiver = Archiver::new(source.clone(), config);

    archiver
        .run(&named(&["bob"]), AgePolicy::Unbounded, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        source.requested_paths(),
        vec!["/users/bob", "/users/2/stories", "/users/2/posts/archived"]
    );
}

#[tokio::test]
async fn max_age_sets_publish_time_bound() {
    let source = MockSource::new().with_items("/users/bob", vec![user(2, "bob")]);
    let config = ArchiverConfig::default().with_only(&[Category::Posts, Category::Messages]);
    let archiver = Archiver::new(source.clone(), config);

    let before = Utc::now().timestamp();
    archiver
        .run(&named(&["bob"]), AgePolicy::MaxAgeDays(3), &CancellationToken::new())
        .await
        .unwrap();
    let after = Utc::now().timestamp();

    let requests = source.requests();
    let posts = requests
        .iter()
        .find(|r| r.category == Category::Posts)
        .unwrap();
    let bound = posts.after_publish_time.unwrap();
    let three_days = 3 * 24 * 60 * 60;
    assert!(bound >= before - three_days && bound <= after - three_days);
}

#[tokio::test]
async fn latest_uses_watermarks() {
    let mark = Utc.with_ymd_and_hms(2024, 2, 10, 0, 0, 0).unwrap();
    let source = MockSource::new()
        .with_items("/users/bob", vec![user(2, "bob")])
        .with_items(
            "/users/2/posts",
            vec![
                json!({ "id": 1, "postedAtPrecise": "1707000000.000000" }),
                json!({ "id": 2, "postedAtPrecise": "1708000000.000000" }),
            ],
        );
    let config = ArchiverConfig::default().with_only(&[Category::Posts]);
    let archiver = Archiver::new(source.clone(), config)
        .with_watermarks(StaticWatermarks::new().with("bob", mark));

    let report = archiver
        .run(&named(&["bob"]), AgePolicy::Latest, &CancellationToken::new())
        .await
        .unwrap();

    let bob = report.profile("bob").unwrap();
    assert_eq!(bob.after, Some(mark));
    // 1707000000 is 2024-02-03, before the watermark.
    assert_eq!(bob.category(Category::Posts).unwrap().items, 1);
    assert_eq!(source.requests()[1].after_publish_time, Some(mark.timestamp()));
}

#[tokio::test]
async fn latest_reads_download_directory() {
    let root = tempfile::TempDir::new().unwrap();
    std::fs::create_dir_all(root.path().join("bob/Posts")).unwrap();
    std::fs::write(root.path().join("bob/Posts/2024-02-10_1.jpg"), b"").unwrap();

    let source = MockSource::new().with_items("/users/bob", vec![user(2, "bob")]);
    let config = ArchiverConfig::default()
        .with_only(&[Category::Posts])
        .with_download_dir(root.path());
    let archiver = Archiver::new(source, config);

    let report = archiver
        .run(&named(&["bob"]), AgePolicy::Latest, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(
        report.profile("bob").unwrap().after,
        Some(Utc.with_ymd_and_hms(2024, 2, 10, 0, 0, 0).unwrap())
    );
}

#[tokio::test]
async fn purchases_are_limited_to_the_profile() {
    let source = MockSource::new()
        .with_items("/users/bob", vec![user(2, "bob")])
        .with_items(
            "/posts/paid",
            vec![
                json!({ "id": 1, "author": { "id": 2 } }),
                json!({ "id": 2, "author": { "id": 9 } }),
                json!({ "id": 3, "fromUser": { "id": 2 } }),
            ],
        );
    let config = ArchiverConfig::default().with_only(&[Category::Purchased]);
    let archiver = Archiver::new(source, config);

    let report = archiver
        .run(&named(&["bob"]), AgePolicy::Unbounded, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(
        report.profile("bob").unwrap().category(Category::Purchased).unwrap().items,
        2
    );
}

#[tokio::test]
async fn concurrent_run_keeps_selection_order() {
    let mut source = MockSource::new();
    let names = ["a", "b", "c", "d", "e"];
    for (i, name) in names.iter().enumerate() {
        source = source.with_items(format!("/users/{name}"), vec![user(i as u64 + 1, name)]);
    }
    let config = ArchiverConfig::default()
        .with_only(&[Category::Posts])
        .with_concurrency(3)
        .unwrap();
    let archiver = Archiver::new(source, config);

    let report = archiver
        .run(&named(&names), AgePolicy::Unbounded, &CancellationToken::new())
        .await
        .unwrap();

    let order: Vec<_> = report.profiles.iter().map(|p| p.profile.as_str()).collect();
    assert_eq!(order, names);
    assert!(report.failed_profiles().is_empty());
}

#[tokio::test]
async fn cancelled_run_makes_no_profile_requests() {
    let source = MockSource::new();
    let archiver = Archiver::new(source.clone(), ArchiverConfig::default());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = archiver
        .run(&named(&["alice", "bob"]), AgePolicy::Unbounded, &cancel)
        .await
        .unwrap();

    assert!(report.cancelled);
    assert!(report.profiles.iter().all(|p| p.cancelled));
    assert!(source.requests().is_empty());
}
