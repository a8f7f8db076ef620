//! Mirrors written snapshots into a git repository.
//!
//! ```text
//!   sync(artifacts)
//!        │
//!        ├─ disabled ───────────────────────────────► Disabled
//!        │
//!        ├─ LocalGit  (working tree present)
//!        │     clean ───────────────────────────────► NoChanges
//!        │     stage → commit dir → resolve url
//!        │     http(s) url, no token ───────────────► SkippedNoCredentials
//!        │     push ────────────────────────────────► Pushed
//!        │     any error ──┐
//!        │                 ▼
//!        └─ RemoteApi (token + owner/repo)
//!              missing config ──────────────────────► RemoteUnconfigured
//!              ref → commit → blobs → tree → commit → update ref
//!              non-2xx ─────────────────────────────► SyncError::Api
//! ```

mod local;
mod remote;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use sitemirror_core::SnapshotArtifact;
use sitemirror_core::dataset::timestamp;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::GitSyncConfig;

pub use local::{
    Git2Workspace, LocalGit, LocalPlan, PushTarget, TOKEN_USER, authenticated_url, redact_url,
    run_local_strategy, url_credentials,
};
pub use remote::{PublishRequest, RemoteApiClient};

/// A way of getting a snapshot commit onto the remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStrategy {
    LocalGit,
    RemoteApi,
}

impl SyncStrategy {
    /// Strategies in the order they are tried.
    pub const ORDER: [SyncStrategy; 2] = [SyncStrategy::LocalGit, SyncStrategy::RemoteApi];
}

impl fmt::Display for SyncStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncStrategy::LocalGit => write!(f, "local git"),
            SyncStrategy::RemoteApi => write!(f, "remote api"),
        }
    }
}

/// Result of a sync that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Sync is switched off.
    Disabled,
    /// The snapshot directory had nothing to commit.
    NoChanges,
    /// Committed locally, but there was no token to push an http(s) remote.
    SkippedNoCredentials,
    /// Local tooling was unusable and the API lacks a token or repository.
    RemoteUnconfigured,
    /// A commit reached the remote branch.
    Pushed {
        strategy: SyncStrategy,
        commit: String,
    },
}

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("git error: {0}")]
    Git(String),
    #[error("cannot add credentials to remote URL: {0}")]
    InvalidRemoteUrl(String),
    #[error("remote {0:?} is not configured")]
    MissingRemote(String),
    #[error("push rejected: {0}")]
    PushRejected(String),
    #[error("API step '{step}' failed with status {status}: {body}")]
    Api {
        step: &'static str,
        status: u16,
        body: String,
    },
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("git task failed: {0}")]
    Task(String),
}

impl From<git2::Error> for SyncError {
    fn from(e: git2::Error) -> Self {
        SyncError::Git(e.message().to_string())
    }
}

enum Attempt {
    Finished(SyncOutcome),
    FallThrough,
}

/// Runs the strategies in [`SyncStrategy::ORDER`] until one finishes.
pub struct GitSyncEngine {
    config: GitSyncConfig,
    snapshot_dir: PathBuf,
    local: Arc<dyn LocalGit>,
    api: RemoteApiClient,
}

impl GitSyncEngine {
    /// Engine backed by libgit2 in `config.workdir`.
    pub fn new(config: GitSyncConfig, snapshot_dir: PathBuf) -> Self {
        let local = Arc::new(Git2Workspace::new(
            config.workdir.clone(),
            config.author_name.clone(),
            config.author_email.clone(),
        ));
        Self::with_local(config, snapshot_dir, local)
    }

    /// Engine with a custom local git implementation.
    pub fn with_local(
        config: GitSyncConfig,
        snapshot_dir: PathBuf,
        local: Arc<dyn LocalGit>,
    ) -> Self {
        let api = RemoteApiClient::new(config.api_base_url.clone());
        Self {
            config,
            snapshot_dir,
            local,
            api,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Mirror the given artifacts, which are already on disk in the
    /// snapshot directory.
    pub async fn sync(&self, artifacts: &[SnapshotArtifact]) -> Result<SyncOutcome, SyncError> {
        if !self.config.enabled {
            debug!("Git sync disabled");
            return Ok(SyncOutcome::Disabled);
        }

        let message = format!(
            "{} {}",
            self.config.commit_prefix,
            timestamp::canonical(&Utc::now())
        );

        for strategy in SyncStrategy::ORDER {
            let attempt = match strategy {
                SyncStrategy::LocalGit => self.try_local(&message).await,
                SyncStrategy::RemoteApi => self.try_remote(artifacts, &message).await?,
            };
            if let Attempt::Finished(outcome) = attempt {
                info!("Git sync via {}: {:?}", strategy, outcome);
                return Ok(outcome);
            }
        }

        Ok(SyncOutcome::RemoteUnconfigured)
    }

    async fn try_local(&self, message: &str) -> Attempt {
        let plan = LocalPlan {
            snapshot_dir: self.snapshot_dir.clone(),
            message: message.to_string(),
            remote_name: self.config.remote_name.clone(),
            remote_url: self.config.remote_url.clone(),
            token: self.config.token.clone(),
        };
        let local = Arc::clone(&self.local);

        let result = tokio::task::spawn_blocking(move || run_local_strategy(local.as_ref(), &plan))
            .await
            .unwrap_or_else(|e| Err(SyncError::Task(e.to_string())));

        match result {
            Ok(Some(outcome)) => Attempt::Finished(outcome),
            Ok(None) => Attempt::FallThrough,
            Err(e) => {
                warn!("Local git sync failed, falling back to the API: {}", e);
                Attempt::FallThrough
            }
        }
    }

    async fn try_remote(
        &self,
        artifacts: &[SnapshotArtifact],
        message: &str,
    ) -> Result<Attempt, SyncError> {
        let (Some(token), Some(repository)) = (&self.config.token, &self.config.repository) else {
            warn!("Git sync API fallback needs a token and GITHUB_REPOSITORY; skipping");
            return Ok(Attempt::Finished(SyncOutcome::RemoteUnconfigured));
        };

        let commit = self
            .api
            .publish(&PublishRequest {
                repository,
                branch: &self.config.branch,
                path_prefix: &self.config.path_prefix,
                message,
                token,
                artifacts,
            })
            .await?;

        Ok(Attempt::Finished(SyncOutcome::Pushed {
            strategy: SyncStrategy::RemoteApi,
            commit,
        }))
    }
}
