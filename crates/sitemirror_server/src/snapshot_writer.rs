//! Debounced, atomic snapshot writes.
//!
//! Edits call [`SnapshotWriter::schedule_snapshot`] as often as they like; the
//! writer keeps a single pending timer and only fires once the edit stream has
//! been quiet for the configured window. When it fires, the producer is asked
//! for the dataset as it is *then*, the artifacts are written with a
//! temp-file-and-rename, and the git mirror is run over the result.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use sitemirror_core::{SerializeError, SnapshotArtifact, SnapshotDataset, serialize};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::SnapshotConfig;
use crate::db::DatasetError;
use crate::git_sync::{GitSyncEngine, SyncError, SyncOutcome};

/// Failure of a single snapshot attempt.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to read dataset: {0}")]
    Dataset(#[from] DatasetError),
    #[error("dataset producer failed: {0}")]
    Producer(String),
    #[error(transparent)]
    Serialize(#[from] SerializeError),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Source of the dataset captured when a scheduled snapshot fires.
#[async_trait]
pub trait DatasetProducer: Send + Sync {
    /// Current dataset, or `None` when there is nothing to snapshot yet.
    async fn produce(&self) -> Result<Option<SnapshotDataset>, SnapshotError>;
}

/// What a snapshot attempt did.
#[derive(Debug)]
pub enum SnapshotRun {
    /// Snapshotting is switched off.
    Disabled,
    /// The producer had nothing to write.
    Empty,
    /// Artifacts were written; `sync` is the mirror's result.
    Written {
        artifacts: Vec<String>,
        sync: Result<SyncOutcome, SyncError>,
    },
}

pub struct SnapshotWriter {
    config: SnapshotConfig,
    sync: Arc<GitSyncEngine>,
    /// The one pending debounce timer.
    timer: Mutex<Option<JoinHandle<()>>>,
    /// Write+sync tasks started by fired timers, awaited by `settle`.
    work: Mutex<Vec<JoinHandle<()>>>,
    /// Serializes write+sync sequences; a second run waits for the first.
    in_flight: tokio::sync::Mutex<()>,
}

impl SnapshotWriter {
    pub fn new(config: SnapshotConfig, sync: Arc<GitSyncEngine>) -> Self {
        Self {
            config,
            sync,
            timer: Mutex::new(None),
            work: Mutex::new(Vec::new()),
            in_flight: tokio::sync::Mutex::new(()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn dir(&self) -> &Path {
        &self.config.dir
    }

    /// Schedule a snapshot after the quiescence window, replacing any
    /// pending one.
    pub fn schedule_snapshot(self: &Arc<Self>, producer: Arc<dyn DatasetProducer>) {
        if !self.config.enabled {
            return;
        }

        let writer = Arc::clone(self);
        let debounce = self.config.debounce;
        let mut timer = lock(&self.timer);
        if let Some(pending) = timer.take() {
            pending.abort();
        }

        *timer = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            // The write runs in its own task so a later reschedule, which
            // aborts this timer, cannot cancel it halfway.
            let runner = Arc::clone(&writer);
            let handle = tokio::spawn(async move {
                match runner.snapshot_now(producer.as_ref()).await {
                    Ok(SnapshotRun::Written { artifacts, sync }) => match sync {
                        Ok(outcome) => debug!(
                            "Snapshot wrote {} artifacts, sync: {:?}",
                            artifacts.len(),
                            outcome
                        ),
                        Err(e) => error!("Snapshot written but git sync failed: {}", e),
                    },
                    Ok(_) => {}
                    Err(e) => error!("Snapshot failed: {}", e),
                }
            });
            let mut work = lock(&writer.work);
            work.retain(|h| !h.is_finished());
            work.push(handle);
        }));
    }

    /// Capture, write and sync right away, bypassing the debounce.
    pub async fn snapshot_now(
        &self,
        producer: &dyn DatasetProducer,
    ) -> Result<SnapshotRun, SnapshotError> {
        if !self.config.enabled {
            return Ok(SnapshotRun::Disabled);
        }

        let _guard = self.in_flight.lock().await;

        let Some(dataset) = producer.produce().await? else {
            debug!("Snapshot skipped: no content yet");
            return Ok(SnapshotRun::Empty);
        };

        let artifacts = serialize(&dataset)?;
        write_artifacts(&self.config.dir, &artifacts).await?;
        info!(
            "Wrote {} snapshot artifacts to {}",
            artifacts.len(),
            self.config.dir.display()
        );

        let sync = self.sync.sync(&artifacts).await;
        if let Err(e) = &sync {
            warn!("Git sync failed: {}", e);
        }

        Ok(SnapshotRun::Written {
            artifacts: artifacts.into_iter().map(|a| a.name).collect(),
            sync,
        })
    }

    /// Wait until the pending timer (if any) and every write it started
    /// have finished.
    pub async fn settle(&self) {
        let timer = lock(&self.timer).take();
        if let Some(timer) = timer {
            // An aborted timer resolves with a cancellation error; that is fine.
            let _ = timer.await;
        }

        let work: Vec<_> = std::mem::take(&mut *lock(&self.work));
        for handle in work {
            if let Err(e) = handle.await {
                warn!("Snapshot task ended abnormally: {}", e);
            }
        }
    }
}

/// Write every artifact as `<dir>/<name>` via a temporary sibling file.
pub async fn write_artifacts(
    dir: &Path,
    artifacts: &[SnapshotArtifact],
) -> Result<(), SnapshotError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| SnapshotError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

    for artifact in artifacts {
        let path = dir.join(&artifact.name);
        let tmp = dir.join(format!(".{}.tmp", artifact.name));
        tokio::fs::write(&tmp, artifact.content.as_bytes())
            .await
            .map_err(|source| SnapshotError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| SnapshotError::Io { path, source })?;
    }
    Ok(())
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
