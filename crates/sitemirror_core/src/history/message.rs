//! Cross-frame history messages (JSON posted between the editor iframe and
//! its hosting window).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use super::action::EditAction;
use crate::error::HistoryError;

/// Type tag carried by every history message.
pub const HISTORY_MESSAGE_TYPE: &str = "site-editor:history-push";

/// A pushed action, replicated to the other frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct HistoryMessage {
    /// Always [`HISTORY_MESSAGE_TYPE`].
    #[serde(rename = "type")]
    pub message_type: String,
    /// The action that was pushed.
    pub action: EditAction,
}

impl HistoryMessage {
    /// Wrap an action for posting.
    pub fn push(action: EditAction) -> Self {
        Self {
            message_type: HISTORY_MESSAGE_TYPE.to_string(),
            action,
        }
    }

    /// Encode as the JSON payload handed to the transport.
    pub fn to_json(&self) -> Result<String, HistoryError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Validate and decode an incoming payload.
    ///
    /// `origin` is the sender's origin as reported by the transport;
    /// `expected_origin` is the receiver's own origin.
    pub fn decode(
        expected_origin: &str,
        origin: &str,
        payload: &str,
    ) -> Result<EditAction, HistoryError> {
        if origin != expected_origin {
            return Err(HistoryError::OriginMismatch {
                expected: expected_origin.to_string(),
                received: origin.to_string(),
            });
        }
        let message: HistoryMessage = serde_json::from_str(payload)?;
        if message.message_type != HISTORY_MESSAGE_TYPE {
            return Err(HistoryError::UnexpectedType(message.message_type));
        }
        Ok(message.action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::action::EditChange;

    const ORIGIN: &str = "https://studio.example.com";

    fn action() -> EditAction {
        EditAction {
            id: "id-1".to_string(),
            label: "Edit phone".to_string(),
            recorded_at: 1,
            change: EditChange::ContactInfo {
                key: "phone".to_string(),
                previous: "555".to_string(),
                next: "556".to_string(),
            },
        }
    }

    #[test]
    fn test_encode_carries_type_tag() {
        let json = HistoryMessage::push(action()).to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], HISTORY_MESSAGE_TYPE);
        assert_eq!(value["action"]["id"], "id-1");
    }

    #[test]
    fn test_decode_accepts_same_origin() {
        let json = HistoryMessage::push(action()).to_json().unwrap();
        let decoded = HistoryMessage::decode(ORIGIN, ORIGIN, &json).unwrap();
        assert_eq!(decoded, action());
    }

    #[test]
    fn test_decode_rejects_foreign_origin() {
        let json = HistoryMessage::push(action()).to_json().unwrap();
        let result = HistoryMessage::decode(ORIGIN, "https://evil.example", &json);
        assert!(matches!(result, Err(HistoryError::OriginMismatch { .. })));
    }

    #[test]
    fn test_decode_rejects_other_type() {
        let json = serde_json::json!({"type": "resize", "action": action()}).to_string();
        let result = HistoryMessage::decode(ORIGIN, ORIGIN, &json);
        assert!(matches!(result, Err(HistoryError::UnexpectedType(t)) if t == "resize"));
    }

    #[test]
    fn test_decode_rejects_malformed() {
        let result = HistoryMessage::decode(ORIGIN, ORIGIN, "{\"type\": 3}");
        assert!(matches!(result, Err(HistoryError::Malformed(_))));
    }
}
