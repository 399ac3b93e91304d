//! Fetch one profile and its first categories from the live API and dump
//! the results.
//!
//! Usage:
//!   cargo run -p sv-ingestion --example fetch_profile -- <username> [credentials.json] [rules.json]

use std::env;
use std::sync::Arc;
use sv_ingestion::{ApiConfig, Category, DataSource, FetchRequest, PlatformSource, SessionStore};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for debug output
    tracing_subscriber::fmt()
        .with_env_filter("sv_ingestion=debug,info")
        .init();

    let args: Vec<String> = env::args().collect();
    let Some(profile) = args.get(1) else {
        eprintln!("usage: fetch_profile <username> [credentials.json] [rules.json]");
        return Ok(());
    };
    let credentials = args.get(2).map(String::as_str).unwrap_or("credentials.json");
    let rules = args.get(3).map(String::as_str).unwrap_or("rules.json");

    let session = Arc::new(SessionStore::load(credentials, rules).await?);
    let source = PlatformSource::new(ApiConfig::from_env()?, session)?;
    let cancel = CancellationToken::new();

    println!("=== {profile} ===\n");

    let info = source.fetch(&FetchRequest::user_info(profile), &cancel).await?;
    let Some(user_id) = info.items().first().and_then(|item| item.id()) else {
        println!("No profile: {:?}", info.error());
        return Ok(());
    };
    println!("id: {user_id}\n");

    for category in [Category::Posts, Category::Stories, Category::Messages] {
        let result = source
            .fetch(&FetchRequest::for_profile(category, &user_id), &cancel)
            .await?;
        println!(
            "{category}: {} items in {} pages{}",
            result.len(),
            result.pages(),
            result
                .error()
                .map(|e| format!(" (error: {e})"))
                .unwrap_or_default()
        );
        if let Some(first) = result.items().first() {
            println!("  first: {}", serde_json::to_string(first)?);
        }
    }

    Ok(())
}
