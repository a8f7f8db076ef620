//! End-to-end: edits land in SQLite, get coalesced into one snapshot write.

use async_trait::async_trait;
use rusqlite::Connection;
use serde_json::Value;
use sitemirror_core::{EditChange, SnapshotDataset};
use sitemirror_server::config::Config;
use sitemirror_server::db::ContentRepo;
use sitemirror_server::mirror::SiteMirror;
use sitemirror_server::snapshot_writer::{DatasetProducer, SnapshotError, SnapshotRun};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn mirror(snapshot_dir: &Path) -> Arc<SiteMirror> {
    let dir = snapshot_dir.to_string_lossy().to_string();
    let config = Config::from_lookup(|key| match key {
        "SNAPSHOT_DIR" => Some(dir.clone()),
        "SNAPSHOT_DEBOUNCE_MS" => Some("25".to_string()),
        _ => None,
    })
    .unwrap();
    Arc::new(SiteMirror::new(
        Arc::new(config),
        Connection::open_in_memory().unwrap(),
    ))
}

fn text_edit(key: &str, next: &str) -> EditChange {
    EditChange::SiteContent {
        key: key.to_string(),
        previous: String::new(),
        next: next.to_string(),
        page: Some("home".to_string()),
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

/// Counts how often the writer asks for the dataset.
struct CountingRepo {
    repo: Arc<ContentRepo>,
    calls: AtomicUsize,
}

#[async_trait]
impl DatasetProducer for CountingRepo {
    async fn produce(&self) -> Result<Option<SnapshotDataset>, SnapshotError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.repo.produce().await
    }
}

#[tokio::test]
async fn burst_of_edits_produces_one_write_with_final_state() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("content-snapshot");
    let mirror = mirror(&dir);
    let producer = Arc::new(CountingRepo {
        repo: mirror.repo().clone(),
        calls: AtomicUsize::new(0),
    });

    for (key, value) in [
        ("hero.title", "Hello"),
        ("hero.subtitle", "Portraits"),
        ("cta.label", "Book"),
        ("hero.title", "Hello there"),
    ] {
        mirror
            .repo()
            .upsert_site_content(key, value, Some("home"))
            .await
            .unwrap();
        mirror.writer().schedule_snapshot(producer.clone());
    }
    mirror.shutdown().await;

    assert_eq!(producer.calls.load(Ordering::SeqCst), 1);
    let content = read_json(&dir.join("site-content.json"));
    let entries = content.as_array().unwrap();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0]["key"], "hero.title");
    assert_eq!(entries[0]["value"], "Hello there");
}

#[tokio::test]
async fn three_entries_and_no_images() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("content-snapshot");
    let mirror = mirror(&dir);

    for (key, value) in [("a", "1"), ("b", "2"), ("c", "3")] {
        mirror.record_edit(&text_edit(key, value)).await.unwrap();
    }
    mirror.shutdown().await;

    for name in sitemirror_core::snapshot::ARTIFACT_NAMES {
        assert!(dir.join(name).is_file(), "missing {}", name);
    }

    let content = read_json(&dir.join("site-content.json"));
    let keys: Vec<&str> = content
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["key"].as_str().unwrap())
        .collect();
    assert_eq!(keys, ["a", "b", "c"]);
    assert_eq!(
        std::fs::read_to_string(dir.join("site-images.json")).unwrap(),
        "[]\n"
    );

    let meta = read_json(&dir.join("meta.json"));
    assert_eq!(meta["schemaVersion"], 1);
    assert!(meta["generatedAt"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn undo_is_recorded_as_the_inverted_change() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("content-snapshot");
    let mirror = mirror(&dir);

    let edit = EditChange::ContactInfo {
        key: "email".to_string(),
        previous: "old@example.com".to_string(),
        next: "new@example.com".to_string(),
    };
    mirror.record_edit(&edit).await.unwrap();
    mirror.record_edit(&edit.inverted()).await.unwrap();
    mirror.shutdown().await;

    let contact = read_json(&dir.join("contact-info.json"));
    assert_eq!(contact[0]["value"], "old@example.com");
}

#[tokio::test]
async fn snapshot_now_on_empty_database_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("content-snapshot");
    let mirror = mirror(&dir);

    assert!(matches!(
        mirror.snapshot_now().await.unwrap(),
        SnapshotRun::Empty
    ));
    assert!(!dir.exists());
}

#[tokio::test]
async fn snapshot_now_reports_artifacts_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("content-snapshot");
    let mirror = mirror(&dir);
    mirror
        .repo()
        .upsert_contact_info("phone", "555-0100")
        .await
        .unwrap();

    match mirror.snapshot_now().await.unwrap() {
        SnapshotRun::Written { artifacts, sync } => {
            assert_eq!(artifacts, sitemirror_core::snapshot::ARTIFACT_NAMES);
            assert!(sync.is_ok());
        }
        other => panic!("unexpected run: {:?}", other),
    }
}
