//! The editable dataset captured for a snapshot.
//!
//! Each collection mirrors one content table. Records are serialized with
//! camelCase keys so the artifacts can be consumed by the site build as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical timestamp encoding: UTC, millisecond precision, `Z` suffix.
///
/// Every date-valued field goes through this module so artifact bytes do not
/// depend on the host's locale or timezone.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    /// Render a timestamp in canonical form, e.g. `2024-05-01T09:30:00.000Z`.
    pub fn canonical(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    /// Serialize a timestamp in canonical form.
    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&canonical(dt))
    }

    /// Deserialize any RFC 3339 timestamp, normalizing it to UTC.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde::de::Error;
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| D::Error::custom(format!("invalid timestamp {raw:?}: {e}")))
    }
}

/// A keyed text block on a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteContentEntry {
    /// Row id.
    pub id: i64,
    /// Content key, e.g. `home.hero.title`.
    pub key: String,
    /// Current text.
    pub value: String,
    /// Page the key belongs to, if scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<String>,
    /// Last edit time.
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// A keyed image slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteImageEntry {
    /// Row id.
    pub id: i64,
    /// Image slot key.
    pub key: String,
    /// Image URL.
    pub url: String,
    /// Alt text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    /// Last edit time.
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// One image in the portfolio gallery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioImageEntry {
    /// Row id.
    pub id: i64,
    /// Caption.
    pub title: String,
    /// Image URL.
    pub image_url: String,
    /// Gallery category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Display order.
    pub sort_order: i64,
    /// Upload time.
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// A toggleable page section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSectionEntry {
    /// Row id.
    pub id: i64,
    /// Section slug.
    pub slug: String,
    /// Section heading.
    pub title: String,
    /// Whether the section is rendered.
    pub visible: bool,
    /// Display order.
    pub sort_order: i64,
    /// Last edit time.
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// A priced service package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageEntry {
    /// Row id.
    pub id: i64,
    /// Package name.
    pub name: String,
    /// Display price, kept as text (currency formatting is the site's job).
    pub price: String,
    /// Short description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Bullet list of included features.
    #[serde(default)]
    pub features: Vec<String>,
    /// Highlighted package.
    pub featured: bool,
    /// Display order.
    pub sort_order: i64,
    /// Last edit time.
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// A client testimonial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestimonialEntry {
    /// Row id.
    pub id: i64,
    /// Who said it.
    pub author: String,
    /// Author's role or company.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    /// The quote.
    pub quote: String,
    /// Star rating, 1-5.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    /// Display order.
    pub sort_order: i64,
    /// Submission time.
    #[serde(with = "timestamp")]
    pub created_at: DateTime<Utc>,
}

/// A contact detail (phone, email, address line, social handle).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfoEntry {
    /// Row id.
    pub id: i64,
    /// Contact key, e.g. `email`.
    pub key: String,
    /// Current value.
    pub value: String,
    /// Last edit time.
    #[serde(with = "timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Point-in-time copy of every editable collection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotDataset {
    /// Page text blocks.
    pub site_content: Vec<SiteContentEntry>,
    /// Image slots.
    pub site_images: Vec<SiteImageEntry>,
    /// Portfolio gallery.
    pub portfolio_images: Vec<PortfolioImageEntry>,
    /// Page sections.
    pub site_sections: Vec<SiteSectionEntry>,
    /// Service packages.
    pub packages: Vec<PackageEntry>,
    /// Testimonials.
    pub testimonials: Vec<TestimonialEntry>,
    /// Contact details.
    pub contact_info: Vec<ContactInfoEntry>,
}

impl SnapshotDataset {
    /// True when no collection holds a record.
    pub fn is_empty(&self) -> bool {
        self.site_content.is_empty()
            && self.site_images.is_empty()
            && self.portfolio_images.is_empty()
            && self.site_sections.is_empty()
            && self.packages.is_empty()
            && self.testimonials.is_empty()
            && self.contact_info.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    #[test]
    fn test_canonical_timestamp_is_utc_millis() {
        let offset = FixedOffset::east_opt(2 * 3600).unwrap();
        let local = offset.with_ymd_and_hms(2024, 5, 1, 11, 30, 0).unwrap();
        let utc = local.with_timezone(&Utc);
        assert_eq!(timestamp::canonical(&utc), "2024-05-01T09:30:00.000Z");
    }

    #[test]
    fn test_deserialize_normalizes_offset() {
        let json = r#"{"id":1,"key":"email","value":"a@b.c","updatedAt":"2024-05-01T11:30:00+02:00"}"#;
        let entry: ContactInfoEntry = serde_json::from_str(json).unwrap();
        let out = serde_json::to_value(&entry).unwrap();
        assert_eq!(out["updatedAt"], "2024-05-01T09:30:00.000Z");
    }

    #[test]
    fn test_optional_fields_omitted() {
        let entry = SiteImageEntry {
            id: 3,
            key: "hero".to_string(),
            url: "/img/hero.jpg".to_string(),
            alt: None,
            updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert!(value.get("alt").is_none());
        assert_eq!(value["url"], "/img/hero.jpg");
    }

    #[test]
    fn test_empty_dataset() {
        assert!(SnapshotDataset::default().is_empty());
    }
}
