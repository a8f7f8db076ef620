use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{Connection, params};
use sitemirror_core::SnapshotDataset;
use sitemirror_core::dataset::{
    ContactInfoEntry, PackageEntry, PortfolioImageEntry, SiteContentEntry, SiteImageEntry,
    SiteSectionEntry, TestimonialEntry,
};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use super::schema::{SchemaEnsurer, SchemaReport};
use crate::snapshot_writer::{DatasetProducer, SnapshotError};

/// Failure reading or writing content rows.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Typed access to the editable content tables.
///
/// Every public operation first awaits the schema ensurer, so the tables are
/// guaranteed to exist before the first query runs.
pub struct ContentRepo {
    conn: Arc<Mutex<Connection>>,
    schema: SchemaEnsurer,
}

impl ContentRepo {
    /// Create a new ContentRepo with the given connection
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
            schema: SchemaEnsurer::new(),
        }
    }

    pub fn schema(&self) -> &SchemaEnsurer {
        &self.schema
    }

    /// Run (or await) schema initialization.
    pub async fn ready(&self) -> Arc<SchemaReport> {
        self.schema.ensure_schema(&self.conn).await
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ===== Snapshot capture =====

    /// Read every collection. Returns `None` while all tables are empty.
    pub async fn load_dataset(&self) -> Result<Option<SnapshotDataset>, DatasetError> {
        self.ready().await;
        let conn = self.lock();

        let dataset = SnapshotDataset {
            site_content: query_all(
                &conn,
                "SELECT id, key, value, page, updated_at FROM site_content ORDER BY id",
                |row| {
                    Ok(SiteContentEntry {
                        id: row.get(0)?,
                        key: row.get(1)?,
                        value: row.get(2)?,
                        page: row.get(3)?,
                        updated_at: timestamp(row, 4)?,
                    })
                },
            )?,
            site_images: query_all(
                &conn,
                "SELECT id, key, url, alt, updated_at FROM site_images ORDER BY id",
                |row| {
                    Ok(SiteImageEntry {
                        id: row.get(0)?,
                        key: row.get(1)?,
                        url: row.get(2)?,
                        alt: row.get(3)?,
                        updated_at: timestamp(row, 4)?,
                    })
                },
            )?,
            portfolio_images: query_all(
                &conn,
                "SELECT id, title, image_url, category, sort_order, created_at \
                 FROM portfolio_images ORDER BY sort_order, id",
                |row| {
                    Ok(PortfolioImageEntry {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        image_url: row.get(2)?,
                        category: row.get(3)?,
                        sort_order: row.get(4)?,
                        created_at: timestamp(row, 5)?,
                    })
                },
            )?,
            site_sections: query_all(
                &conn,
                "SELECT id, slug, title, visible, sort_order, updated_at \
                 FROM site_sections ORDER BY sort_order, id",
                |row| {
                    Ok(SiteSectionEntry {
                        id: row.get(0)?,
                        slug: row.get(1)?,
                        title: row.get(2)?,
                        visible: row.get::<_, i64>(3)? != 0,
                        sort_order: row.get(4)?,
                        updated_at: timestamp(row, 5)?,
                    })
                },
            )?,
            packages: query_all(
                &conn,
                "SELECT id, name, price, description, features, featured, sort_order, updated_at \
                 FROM packages ORDER BY sort_order, id",
                |row| {
                    let raw_features: String = row.get(4)?;
                    let features = serde_json::from_str(&raw_features).map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e))
                    })?;
                    Ok(PackageEntry {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        price: row.get(2)?,
                        description: row.get(3)?,
                        features,
                        featured: row.get::<_, i64>(5)? != 0,
                        sort_order: row.get(6)?,
                        updated_at: timestamp(row, 7)?,
                    })
                },
            )?,
            testimonials: query_all(
                &conn,
                "SELECT id, author, role, quote, rating, sort_order, created_at \
                 FROM testimonials ORDER BY sort_order, id",
                |row| {
                    Ok(TestimonialEntry {
                        id: row.get(0)?,
                        author: row.get(1)?,
                        role: row.get(2)?,
                        quote: row.get(3)?,
                        rating: row.get::<_, Option<u8>>(4)?,
                        sort_order: row.get(5)?,
                        created_at: timestamp(row, 6)?,
                    })
                },
            )?,
            contact_info: query_all(
                &conn,
                "SELECT id, key, value, updated_at FROM contact_info ORDER BY id",
                |row| {
                    Ok(ContactInfoEntry {
                        id: row.get(0)?,
                        key: row.get(1)?,
                        value: row.get(2)?,
                        updated_at: timestamp(row, 3)?,
                    })
                },
            )?,
        };

        if dataset.is_empty() {
            Ok(None)
        } else {
            Ok(Some(dataset))
        }
    }

    // ===== Edits =====

    /// Insert or update a page text block.
    pub async fn upsert_site_content(
        &self,
        key: &str,
        value: &str,
        page: Option<&str>,
    ) -> Result<(), DatasetError> {
        self.ready().await;
        let conn = self.lock();
        conn.execute(
            "INSERT INTO site_content (key, value, page, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                 page = COALESCE(excluded.page, site_content.page),
                 updated_at = excluded.updated_at",
            params![key, value, page, now_millis()],
        )?;
        Ok(())
    }

    /// Insert or update an image slot.
    pub async fn upsert_site_image(
        &self,
        key: &str,
        url: &str,
        alt: Option<&str>,
    ) -> Result<(), DatasetError> {
        self.ready().await;
        let conn = self.lock();
        conn.execute(
            "INSERT INTO site_images (key, url, alt, updated_at) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET url = excluded.url, alt = excluded.alt,
                 updated_at = excluded.updated_at",
            params![key, url, alt, now_millis()],
        )?;
        Ok(())
    }

    /// Insert or update a contact detail.
    pub async fn upsert_contact_info(&self, key: &str, value: &str) -> Result<(), DatasetError> {
        self.ready().await;
        let conn = self.lock();
        conn.execute(
            "INSERT INTO contact_info (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value,
                 updated_at = excluded.updated_at",
            params![key, value, now_millis()],
        )?;
        Ok(())
    }
}

#[async_trait]
impl DatasetProducer for ContentRepo {
    async fn produce(&self) -> Result<Option<SnapshotDataset>, SnapshotError> {
        Ok(self.load_dataset().await?)
    }
}

fn query_all<T, F>(conn: &Connection, sql: &str, map: F) -> Result<Vec<T>, rusqlite::Error>
where
    F: FnMut(&rusqlite::Row<'_>) -> Result<T, rusqlite::Error>,
{
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], map)?;
    rows.collect()
}

fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Millisecond timestamp column. Values chrono cannot represent are an error.
fn timestamp(row: &rusqlite::Row<'_>, idx: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    let ms: i64 = row.get(idx)?;
    DateTime::from_timestamp_millis(ms).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, ms))
}
