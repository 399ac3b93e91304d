//! sv: Command-line archiver for the subscription platform.
//!
//! This binary wires together the ingestion and archiver crates and runs one
//! archiving pass over the selected profiles.

use anyhow::{bail, Context};
use chrono::{Duration as ChronoDuration, Utc};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use sv_archiver::{AgePolicy, Archiver, ArchiverConfig, ProfileSelection};
use sv_ingestion::{ApiConfig, PlatformSource, SessionStore};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Archive content from subscribed profiles.
#[derive(Parser, Debug)]
#[command(name = "sv", author, version)]
#[command(after_help = "A trailing number is the maximum age in days. \
    0 resumes each profile from the newest date already in the download directory.")]
struct Args {
    /// Profiles to archive, or `all` for every active subscription
    #[arg(required = true, value_name = "PROFILES")]
    profiles: Vec<String>,

    /// Session credentials JSON
    #[arg(long, env = "SV_CREDENTIALS", default_value = "credentials.json")]
    credentials: PathBuf,

    /// Signing rules JSON
    #[arg(long, env = "SV_RULES", default_value = "rules.json")]
    rules: PathBuf,

    /// Archive root (overrides SV_DOWNLOAD_DIR)
    #[arg(long, value_name = "DIR")]
    download_dir: Option<PathBuf>,

    /// Profiles processed at once (overrides SV_CONCURRENCY)
    #[arg(long)]
    concurrency: Option<usize>,

    /// Seconds between checks for changed credentials/rules files; 0 disables
    #[arg(long, env = "SV_RULES_RELOAD_SECS", default_value_t = 300)]
    rules_reload_secs: u64,

    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sv_cli=info,sv_archiver=info,sv_ingestion=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let (selection, age) = parse_targets(&args.profiles)?;

    match age {
        AgePolicy::MaxAgeDays(days) => {
            if let Some(since) =
                Utc::now().checked_sub_signed(ChronoDuration::days(i64::from(days)))
            {
                println!(
                    "Getting posts newer than {} UTC",
                    since.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
        AgePolicy::Latest => println!("Getting posts newer than the latest archived date"),
        AgePolicy::Unbounded => {}
    }

    // Parse configuration from environment, then apply flags
    let api_config = ApiConfig::from_env()?;
    let mut archiver_config = ArchiverConfig::from_env()?;
    if let Some(dir) = args.download_dir {
        archiver_config = archiver_config.with_download_dir(dir);
    }
    if let Some(concurrency) = args.concurrency {
        archiver_config = archiver_config.with_concurrency(concurrency)?;
    }
    if age == AgePolicy::Latest && archiver_config.download_dir.is_none() {
        tracing::warn!("Max age 0 without a download directory; fetching everything");
    }

    let session = SessionStore::load(&args.credentials, &args.rules)
        .await
        .with_context(|| {
            format!(
                "failed to load session from {} and {}",
                args.credentials.display(),
                args.rules.display()
            )
        })?;
    let session = Arc::new(session);

    let cancel = CancellationToken::new();
    let background = CancellationToken::new();

    let reload = (args.rules_reload_secs > 0).then(|| {
        session.spawn_reload(
            Duration::from_secs(args.rules_reload_secs),
            background.clone(),
        )
    });

    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, finishing the current request and stopping");
                cancel.cancel();
            }
        })
    };

    tracing::info!(
        "Starting sv against {} ({:?}, {:?})",
        api_config.base_url,
        selection,
        age
    );

    let source = PlatformSource::new(api_config, Arc::clone(&session))?;
    let archiver = Archiver::new(source, archiver_config);
    let report = archiver.run(&selection, age, &cancel).await;

    background.cancel();
    ctrl_c.abort();
    if let Some(handle) = reload {
        handle.await.ok();
    }

    let report = report?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report.summary());
    }

    let failed = report.failed_profiles();
    if !failed.is_empty() {
        tracing::warn!("Profiles with problems: {}", failed.join(", "));
    }

    Ok(())
}

/// Split positional arguments into the profile selection and age policy.
///
/// A trailing all-digit argument after at least one profile is the maximum
/// age in days. `all` anywhere selects every subscription.
fn parse_targets(args: &[String]) -> anyhow::Result<(ProfileSelection, AgePolicy)> {
    let (profiles, age) = match args.split_last() {
        Some((last, rest)) if !rest.is_empty() && is_number(last) => {
            let days: u32 = last
                .parse()
                .with_context(|| format!("max age {last:?} is out of range"))?;
            let age = AgePolicy::from_days(days);
            age.validate(Utc::now())?;
            (rest, age)
        }
        _ => (args, AgePolicy::Unbounded),
    };

    if profiles.is_empty() {
        bail!("no profile given");
    }

    let selection = if profiles.iter().any(|p| p.eq_ignore_ascii_case("all")) {
        ProfileSelection::All
    } else {
        ProfileSelection::Named(profiles.to_vec())
    };
    Ok((selection, age))
}

fn is_number(arg: &str) -> bool {
    !arg.is_empty() && arg.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_profiles_only() {
        let (selection, age) = parse_targets(&args(&["alice", "bob"])).unwrap();
        assert_eq!(
            selection,
            ProfileSelection::Named(vec!["alice".into(), "bob".into()])
        );
        assert_eq!(age, AgePolicy::Unbounded);
    }

    #[test]
    fn test_trailing_max_age() {
        let (selection, age) = parse_targets(&args(&["alice", "7"])).unwrap();
        assert_eq!(selection, ProfileSelection::Named(vec!["alice".into()]));
        assert_eq!(age, AgePolicy::MaxAgeDays(7));
    }

    #[test]
    fn test_zero_means_latest() {
        let (selection, age) = parse_targets(&args(&["all", "0"])).unwrap();
        assert_eq!(selection, ProfileSelection::All);
        assert_eq!(age, AgePolicy::Latest);
    }

    #[test]
    fn test_lone_number_is_a_profile() {
        let (selection, age) = parse_targets(&args(&["12345"])).unwrap();
        assert_eq!(selection, ProfileSelection::Named(vec!["12345".into()]));
        assert_eq!(age, AgePolicy::Unbounded);
    }

    #[test]
    fn test_oversized_age_rejected() {
        assert!(parse_targets(&args(&["alice", "99999999999"])).is_err());
        // Fits a u32 but reaches before the earliest representable date.
        assert!(parse_targets(&args(&["alice", "4000000000"])).is_err());
        assert!(parse_targets(&args(&["alice", "36500"])).is_ok());
    }

    #[test]
    fn test_cli_requires_a_profile() {
        assert!(Args::try_parse_from(["sv"]).is_err());
        let parsed = Args::try_parse_from(["sv", "alice", "--json"]).unwrap();
        assert!(parsed.json);
        assert_eq!(parsed.profiles, vec!["alice"]);
    }
}
