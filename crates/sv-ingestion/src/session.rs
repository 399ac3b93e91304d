//! Credentials and signing rules, reloadable at runtime.
//!
//! The platform rotates its signing rules often, and sessions expire, so a
//! long-running process must be able to pick up new files without a
//! restart. [`SessionStore`] holds the current [`Session`] behind an
//! `Arc` and swaps it wholesale on reload; requests take a snapshot and are
//! never affected by a swap in the middle of signing.
//!
//! A reload only replaces the session if both files parse and validate.
//! A bad rotation is reported and the previous session stays active.

use crate::error::IngestionError;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use sv_types::{Credentials, SigningRules};
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A validated credentials + rules pair.
#[derive(Debug, Clone)]
pub struct Session {
    credentials: Credentials,
    rules: SigningRules,
    app_token: String,
}

impl Session {
    /// Combine credentials and rules.
    ///
    /// The app token comes from the rules when they carry one (they rotate
    /// together), otherwise from the credentials.
    pub fn new(credentials: Credentials, rules: SigningRules) -> Result<Self, IngestionError> {
        credentials.validate()?;
        let app_token = rules
            .app_token()
            .map(str::to_string)
            .or_else(|| credentials.app_token.clone())
            .ok_or_else(|| {
                IngestionError::Config(
                    "no app_token in either the credentials or the signing rules".into(),
                )
            })?;
        Ok(Self {
            credentials,
            rules,
            app_token,
        })
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn rules(&self) -> &SigningRules {
        &self.rules
    }

    pub fn app_token(&self) -> &str {
        &self.app_token
    }
}

#[derive(Debug, Clone)]
struct SessionFiles {
    credentials: PathBuf,
    rules: PathBuf,
}

/// Shared, hot-reloadable session holder.
#[derive(Debug)]
pub struct SessionStore {
    files: Option<SessionFiles>,
    current: RwLock<Arc<Session>>,
    /// Modification times seen at the last successful load.
    seen: Mutex<Option<(SystemTime, SystemTime)>>,
}

impl SessionStore {
    /// A store with a fixed session and no backing files.
    pub fn fixed(session: Session) -> Self {
        Self {
            files: None,
            current: RwLock::new(Arc::new(session)),
            seen: Mutex::new(None),
        }
    }

    /// Load and validate both files.
    ///
    /// # Errors
    ///
    /// [`IngestionError::Io`] if a file cannot be read,
    /// [`IngestionError::Config`] if either does not validate.
    pub async fn load(
        credentials_path: impl Into<PathBuf>,
        rules_path: impl Into<PathBuf>,
    ) -> Result<Self, IngestionError> {
        let files = SessionFiles {
            credentials: credentials_path.into(),
            rules: rules_path.into(),
        };
        let session = read_session(&files).await?;
        let mtimes = modified_times(&files).await.ok();

        tracing::info!(
            "Loaded session for user {} (rules revision: {})",
            session.credentials().user_id,
            session.rules().revision().unwrap_or("unknown")
        );

        Ok(Self {
            files: Some(files),
            current: RwLock::new(Arc::new(session)),
            seen: Mutex::new(mtimes),
        })
    }

    /// The session to sign the next request with.
    pub async fn snapshot(&self) -> Arc<Session> {
        self.current.read().await.clone()
    }

    /// Re-read both files and swap the session in.
    ///
    /// On error the current session is kept.
    pub async fn reload(&self) -> Result<Arc<Session>, IngestionError> {
        let Some(files) = &self.files else {
            return Err(IngestionError::Config(
                "session has no backing files to reload".into(),
            ));
        };

        let session = match read_session(files).await {
            Ok(session) => Arc::new(session),
            Err(e) => {
                tracing::warn!("Session reload failed, keeping previous session: {}", e);
                return Err(e);
            }
        };

        let previous = {
            let mut guard = self.current.write().await;
            std::mem::replace(&mut *guard, session.clone())
        };
        *self.seen.lock().await = modified_times(files).await.ok();

        tracing::info!(
            "Reloaded session (rules revision: {} -> {})",
            previous.rules().revision().unwrap_or("unknown"),
            session.rules().revision().unwrap_or("unknown")
        );
        Ok(session)
    }

    /// Reload if either file changed since the last successful load.
    ///
    /// Returns whether a new session was installed.
    pub async fn reload_if_changed(&self) -> Result<bool, IngestionError> {
        let Some(files) = &self.files else {
            return Ok(false);
        };
        let now = modified_times(files).await?;
        let changed = *self.seen.lock().await != Some(now);
        if changed {
            self.reload().await?;
        }
        Ok(changed)
    }

    /// Poll the files every `interval` and reload on change until cancelled.
    pub fn spawn_reload(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        let store = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        if let Err(e) = store.reload_if_changed().await {
                            tracing::warn!("Session watch: {}", e);
                        }
                    }
                }
            }
            tracing::debug!("Session reload task stopped");
        })
    }
}

async fn read_session(files: &SessionFiles) -> Result<Session, IngestionError> {
    let credentials = read_file(&files.credentials).await?;
    let rules = read_file(&files.rules).await?;

    let credentials = Credentials::from_json(&credentials).map_err(|e| {
        IngestionError::Config(format!("{}: {e}", files.credentials.display()))
    })?;
    let rules = SigningRules::from_json(&rules)
        .map_err(|e| IngestionError::Config(format!("{}: {e}", files.rules.display())))?;

    Session::new(credentials, rules)
}

async fn read_file(path: &Path) -> Result<String, IngestionError> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        IngestionError::Io(std::io::Error::new(
            e.kind(),
            format!("{}: {e}", path.display()),
        ))
    })
}

async fn modified_times(files: &SessionFiles) -> Result<(SystemTime, SystemTime), IngestionError> {
    let credentials = tokio::fs::metadata(&files.credentials).await?.modified()?;
    let rules = tokio::fs::metadata(&files.rules).await?.modified()?;
    Ok((credentials, rules))
}
