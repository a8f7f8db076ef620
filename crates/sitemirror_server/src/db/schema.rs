use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde::Serialize;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

/// Structural statements for the content tables, applied in order.
///
/// Every statement is create-if-absent; nothing here drops or alters an
/// existing table or index.
const STATEMENTS: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS site_content (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    key TEXT NOT NULL UNIQUE,
    value TEXT NOT NULL DEFAULT '',
    page TEXT,
    updated_at INTEGER NOT NULL
)"#,
    "CREATE INDEX IF NOT EXISTS idx_site_content_page ON site_content(page)",
    r#"CREATE TABLE IF NOT EXISTS site_images (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    key TEXT NOT NULL UNIQUE,
    url TEXT NOT NULL,
    alt TEXT,
    updated_at INTEGER NOT NULL
)"#,
    r#"CREATE TABLE IF NOT EXISTS portfolio_images (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL DEFAULT '',
    image_url TEXT NOT NULL,
    category TEXT,
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
)"#,
    "CREATE INDEX IF NOT EXISTS idx_portfolio_images_order ON portfolio_images(sort_order, id)",
    r#"CREATE TABLE IF NOT EXISTS site_sections (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    slug TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL DEFAULT '',
    visible INTEGER NOT NULL DEFAULT 1,
    sort_order INTEGER NOT NULL DEFAULT 0,
    updated_at INTEGER NOT NULL
)"#,
    r#"CREATE TABLE IF NOT EXISTS packages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    price TEXT NOT NULL DEFAULT '',
    description TEXT,
    features TEXT NOT NULL DEFAULT '[]', -- JSON array of strings
    featured INTEGER NOT NULL DEFAULT 0,
    sort_order INTEGER NOT NULL DEFAULT 0,
    updated_at INTEGER NOT NULL
)"#,
    r#"CREATE TABLE IF NOT EXISTS testimonials (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    author TEXT NOT NULL,
    role TEXT,
    quote TEXT NOT NULL,
    rating INTEGER,
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
)"#,
    r#"CREATE TABLE IF NOT EXISTS contact_info (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    key TEXT NOT NULL UNIQUE,
    value TEXT NOT NULL DEFAULT '',
    updated_at INTEGER NOT NULL
)"#,
];

/// Progress of the one-time schema initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaState {
    NotStarted,
    InProgress,
    Done,
}

/// Outcome of schema initialization, shared by every caller.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchemaReport {
    /// Statements that executed successfully.
    pub applied: usize,
    /// Error messages of statements that failed, in statement order.
    pub failed: Vec<String>,
}

impl SchemaReport {
    /// True when every statement applied.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Single-flight, memoized schema initializer.
///
/// The first call to [`SchemaEnsurer::ensure_schema`] runs the statements;
/// concurrent callers wait on that same run and later callers get its
/// memoized report. The result is never reset.
#[derive(Debug, Default)]
pub struct SchemaEnsurer {
    started: AtomicBool,
    report: OnceCell<Arc<SchemaReport>>,
}

impl SchemaEnsurer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make sure the content tables exist.
    pub async fn ensure_schema(&self, conn: &Arc<Mutex<Connection>>) -> Arc<SchemaReport> {
        self.report
            .get_or_init(|| async {
                self.started.store(true, Ordering::SeqCst);
                let conn = conn.clone();
                let report = tokio::task::spawn_blocking(move || {
                    let conn = conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                    apply_statements(&conn)
                })
                .await
                .unwrap_or_else(|e| {
                    warn!("Schema initialization task failed: {}", e);
                    SchemaReport {
                        applied: 0,
                        failed: vec![e.to_string()],
                    }
                });
                Arc::new(report)
            })
            .await
            .clone()
    }

    pub fn state(&self) -> SchemaState {
        if self.report.initialized() {
            SchemaState::Done
        } else if self.started.load(Ordering::SeqCst) {
            SchemaState::InProgress
        } else {
            SchemaState::NotStarted
        }
    }

    /// The memoized report, if initialization has finished.
    pub fn report(&self) -> Option<Arc<SchemaReport>> {
        self.report.get().cloned()
    }
}

/// Run every statement, continuing past failures.
pub fn apply_statements(conn: &Connection) -> SchemaReport {
    let mut report = SchemaReport::default();
    for (index, statement) in STATEMENTS.iter().enumerate() {
        match conn.execute_batch(statement) {
            Ok(()) => report.applied += 1,
            Err(e) => {
                warn!("Schema statement {} failed: {}", index, e);
                report.failed.push(e.to_string());
            }
        }
    }
    debug!(
        "Schema initialization applied {} of {} statements",
        report.applied,
        STATEMENTS.len()
    );
    report
}
