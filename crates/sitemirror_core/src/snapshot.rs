//! Dataset → snapshot artifact serialization.
//!
//! A snapshot is always exactly eight pretty-printed JSON files, metadata
//! first, in the order of [`ARTIFACT_NAMES`]. Apart from `meta.json`'s
//! `generatedAt`, the output is a pure function of the dataset.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::dataset::{SnapshotDataset, timestamp};
use crate::error::SerializeError;

/// Version of the artifact layout, bumped when a file's shape changes.
pub const SCHEMA_VERSION: u32 = 1;

/// Metadata artifact name.
pub const META_ARTIFACT: &str = "meta.json";

/// Every artifact name, in emission order.
pub const ARTIFACT_NAMES: [&str; 8] = [
    META_ARTIFACT,
    "site-content.json",
    "site-images.json",
    "portfolio-images.json",
    "site-sections.json",
    "packages.json",
    "testimonials.json",
    "contact-info.json",
];

/// One named text file produced by serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotArtifact {
    /// File name inside the snapshot directory.
    pub name: String,
    /// UTF-8 file content.
    pub content: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SnapshotMeta {
    generated_at: String,
    schema_version: u32,
}

/// Serialize `dataset`, stamping the metadata with the current time.
pub fn serialize(dataset: &SnapshotDataset) -> Result<Vec<SnapshotArtifact>, SerializeError> {
    serialize_at(dataset, Utc::now())
}

/// Serialize `dataset` with an explicit metadata timestamp.
pub fn serialize_at(
    dataset: &SnapshotDataset,
    generated_at: DateTime<Utc>,
) -> Result<Vec<SnapshotArtifact>, SerializeError> {
    let meta = SnapshotMeta {
        generated_at: timestamp::canonical(&generated_at),
        schema_version: SCHEMA_VERSION,
    };

    let [
        meta_name,
        content_name,
        images_name,
        portfolio_name,
        sections_name,
        packages_name,
        testimonials_name,
        contact_name,
    ] = ARTIFACT_NAMES;

    Ok(vec![
        artifact(meta_name, &meta)?,
        artifact(content_name, &dataset.site_content)?,
        artifact(images_name, &dataset.site_images)?,
        artifact(portfolio_name, &dataset.portfolio_images)?,
        artifact(sections_name, &dataset.site_sections)?,
        artifact(packages_name, &dataset.packages)?,
        artifact(testimonials_name, &dataset.testimonials)?,
        artifact(contact_name, &dataset.contact_info)?,
    ])
}

fn artifact<T: Serialize + ?Sized>(
    name: &'static str,
    value: &T,
) -> Result<SnapshotArtifact, SerializeError> {
    let mut content = serde_json::to_string_pretty(value).map_err(|source| {
        SerializeError::Encode {
            artifact: name,
            source,
        }
    })?;
    content.push('\n');
    Ok(SnapshotArtifact {
        name: name.to_string(),
        content,
    })
}
