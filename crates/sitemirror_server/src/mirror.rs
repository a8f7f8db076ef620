use std::sync::Arc;

use rusqlite::Connection;
use sitemirror_core::EditChange;

use crate::config::Config;
use crate::db::{ContentRepo, DatasetError};
use crate::git_sync::GitSyncEngine;
use crate::snapshot_writer::{SnapshotError, SnapshotRun, SnapshotWriter};

/// Ties the content database, the snapshot writer and the git mirror
/// together. Shared by `Arc` between handlers and background tasks.
pub struct SiteMirror {
    repo: Arc<ContentRepo>,
    writer: Arc<SnapshotWriter>,
    sync: Arc<GitSyncEngine>,
}

impl SiteMirror {
    pub fn new(config: Arc<Config>, conn: Connection) -> Self {
        let sync = Arc::new(GitSyncEngine::new(
            config.git.clone(),
            config.snapshot.dir.clone(),
        ));
        Self::with_sync(config, conn, sync)
    }

    /// Build around an existing sync engine.
    pub fn with_sync(config: Arc<Config>, conn: Connection, sync: Arc<GitSyncEngine>) -> Self {
        let writer = Arc::new(SnapshotWriter::new(
            config.snapshot.clone(),
            Arc::clone(&sync),
        ));
        Self {
            repo: Arc::new(ContentRepo::new(conn)),
            writer,
            sync,
        }
    }

    pub fn repo(&self) -> &Arc<ContentRepo> {
        &self.repo
    }

    pub fn writer(&self) -> &Arc<SnapshotWriter> {
        &self.writer
    }

    pub fn sync_engine(&self) -> &Arc<GitSyncEngine> {
        &self.sync
    }

    /// Persist the `next` side of an edit, then schedule a snapshot.
    ///
    /// Undo is recording the inverted change.
    pub async fn record_edit(&self, change: &EditChange) -> Result<(), DatasetError> {
        match change {
            EditChange::SiteContent {
                key, next, page, ..
            } => {
                self.repo
                    .upsert_site_content(key, next, page.as_deref())
                    .await?
            }
            EditChange::ContactInfo { key, next, .. } => {
                self.repo.upsert_contact_info(key, next).await?
            }
            EditChange::SiteImage { key, next, .. } => {
                self.repo
                    .upsert_site_image(key, &next.url, next.alt.as_deref())
                    .await?
            }
        }
        self.schedule_snapshot();
        Ok(())
    }

    /// Debounced snapshot of the database.
    pub fn schedule_snapshot(&self) {
        self.writer.schedule_snapshot(self.repo.clone());
    }

    /// Snapshot the database right away.
    pub async fn snapshot_now(&self) -> Result<SnapshotRun, SnapshotError> {
        self.writer.snapshot_now(self.repo.as_ref()).await
    }

    /// Let pending snapshot work finish.
    pub async fn shutdown(&self) {
        self.writer.settle().await;
    }
}
