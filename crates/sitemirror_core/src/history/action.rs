//! Undoable edit actions.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// An image slot's value before or after an edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct ImageValue {
    /// Image URL.
    pub url: String,
    /// Alt text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub alt: Option<String>,
}

/// What an action changed. The `kind` tag selects the content table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub enum EditChange {
    /// A page text block.
    SiteContent {
        /// Content key.
        key: String,
        /// Text before the edit.
        previous: String,
        /// Text after the edit.
        next: String,
        /// Page the key is scoped to.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        #[ts(optional)]
        page: Option<String>,
    },
    /// A contact detail.
    ContactInfo {
        /// Contact key.
        key: String,
        /// Value before the edit.
        previous: String,
        /// Value after the edit.
        next: String,
    },
    /// An image slot.
    SiteImage {
        /// Image slot key.
        key: String,
        /// Image before the edit.
        previous: ImageValue,
        /// Image after the edit.
        next: ImageValue,
    },
}

impl EditChange {
    /// The key of the changed record.
    pub fn key(&self) -> &str {
        match self {
            EditChange::SiteContent { key, .. }
            | EditChange::ContactInfo { key, .. }
            | EditChange::SiteImage { key, .. } => key,
        }
    }

    /// The same change applied backwards.
    pub fn inverted(&self) -> EditChange {
        match self.clone() {
            EditChange::SiteContent {
                key,
                previous,
                next,
                page,
            } => EditChange::SiteContent {
                key,
                previous: next,
                next: previous,
                page,
            },
            EditChange::ContactInfo {
                key,
                previous,
                next,
            } => EditChange::ContactInfo {
                key,
                previous: next,
                next: previous,
            },
            EditChange::SiteImage {
                key,
                previous,
                next,
            } => EditChange::SiteImage {
                key,
                previous: next,
                next: previous,
            },
        }
    }
}

/// A single undoable/redoable content change.
///
/// `id` is the action's identity: two actions with identical payloads are
/// still distinct entries in the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct EditAction {
    /// Unique action id (UUID v4).
    pub id: String,
    /// Human-readable description shown in the editor toolbar.
    pub label: String,
    /// Milliseconds since the Unix epoch.
    #[ts(type = "number")]
    pub recorded_at: i64,
    /// The change itself.
    pub change: EditChange,
}

impl EditAction {
    /// Record a new action now.
    pub fn new(label: impl Into<String>, change: EditChange) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            label: label.into(),
            recorded_at: chrono::Utc::now().timestamp_millis(),
            change,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_site_content_wire_shape() {
        let action = EditAction {
            id: "a1".to_string(),
            label: "Edit hero title".to_string(),
            recorded_at: 1_700_000_000_000,
            change: EditChange::SiteContent {
                key: "hero.title".to_string(),
                previous: "Old".to_string(),
                next: "New".to_string(),
                page: None,
            },
        };
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["recordedAt"], 1_700_000_000_000_i64);
        assert_eq!(value["change"]["kind"], "siteContent");
        assert_eq!(value["change"]["next"], "New");
        assert!(value["change"].get("page").is_none());
    }

    #[test]
    fn test_site_image_round_trips() {
        let json = r#"{
            "id": "b2",
            "label": "Swap hero image",
            "recordedAt": 5,
            "change": {
                "kind": "siteImage",
                "key": "hero",
                "previous": {"url": "/a.jpg"},
                "next": {"url": "/b.jpg", "alt": "Beach"}
            }
        }"#;
        let action: EditAction = serde_json::from_str(json).unwrap();
        assert_eq!(action.change.key(), "hero");
        match &action.change {
            EditChange::SiteImage { next, .. } => assert_eq!(next.alt.as_deref(), Some("Beach")),
            other => panic!("Expected SiteImage, got {:?}", other),
        }
    }

    #[test]
    fn test_inverted_swaps_values() {
        let change = EditChange::ContactInfo {
            key: "phone".to_string(),
            previous: "1".to_string(),
            next: "2".to_string(),
        };
        assert_eq!(
            change.inverted(),
            EditChange::ContactInfo {
                key: "phone".to_string(),
                previous: "2".to_string(),
                next: "1".to_string(),
            }
        );
    }

    #[test]
    fn test_new_actions_have_distinct_ids() {
        let change = EditChange::ContactInfo {
            key: "email".to_string(),
            previous: String::new(),
            next: "x@y.z".to_string(),
        };
        let a = EditAction::new("Edit email", change.clone());
        let b = EditAction::new("Edit email", change);
        assert_ne!(a.id, b.id);
    }
}
