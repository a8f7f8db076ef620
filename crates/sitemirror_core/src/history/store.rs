//! Bounded undo/redo log, replicated from the editor frame to its host.
//!
//! The store lives on one thread (the frame's event loop) and is mutated
//! through `&mut self`. When it runs inside a nested frame it owns a
//! [`ParentChannel`] and forwards every locally pushed action upward;
//! actions that arrive through [`EditHistoryStore::receive`] are never
//! forwarded again, so two frames cannot bounce a message back and forth.

use std::collections::VecDeque;

use serde::Serialize;
use ts_rs::TS;

use super::action::EditAction;
use super::message::HistoryMessage;

/// Maximum entries kept on each stack.
pub const HISTORY_LIMIT: usize = 50;

/// Outbound half of the cross-frame transport.
///
/// Implementations post the message to the hosting window, restricted to
/// `target_origin`. Delivery is best-effort: no acknowledgement, no retry.
pub trait ParentChannel: Send {
    /// Post `message` to the parent frame.
    fn post(&self, message: &HistoryMessage, target_origin: &str);
}

/// Read-only copy of both stacks, most recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct HistorySnapshot {
    /// Actions that can be undone.
    pub undo: Vec<EditAction>,
    /// Actions that can be redone.
    pub redo: Vec<EditAction>,
}

/// Callback invoked with a fresh snapshot after every state change.
pub type HistoryCallback = Box<dyn Fn(&HistorySnapshot) + Send>;

/// Handle returned by [`EditHistoryStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Undo/redo log of edit actions.
pub struct EditHistoryStore {
    origin: String,
    parent: Option<Box<dyn ParentChannel>>,
    undo: VecDeque<EditAction>,
    redo: VecDeque<EditAction>,
    subscribers: Vec<(SubscriptionId, HistoryCallback)>,
    next_subscription: u64,
}

impl EditHistoryStore {
    /// Store for a top-level window. Nothing is broadcast.
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            parent: None,
            undo: VecDeque::with_capacity(HISTORY_LIMIT),
            redo: VecDeque::with_capacity(HISTORY_LIMIT),
            subscribers: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Store for a nested frame that replicates pushes to its parent.
    pub fn nested(origin: impl Into<String>, parent: Box<dyn ParentChannel>) -> Self {
        let mut store = Self::new(origin);
        store.parent = Some(parent);
        store
    }

    /// Origin this store accepts messages from.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Whether pushes are forwarded to a parent frame.
    pub fn is_nested(&self) -> bool {
        self.parent.is_some()
    }

    /// Record a new action. Clears the redo stack.
    pub fn push(&mut self, action: EditAction) {
        self.push_inner(action, true);
    }

    fn push_inner(&mut self, action: EditAction, broadcast: bool) {
        if broadcast && let Some(parent) = &self.parent {
            parent.post(&HistoryMessage::push(action.clone()), &self.origin);
        }
        prepend_bounded(&mut self.undo, action);
        self.redo.clear();
        self.notify();
    }

    /// Move the most recent undoable action onto the redo stack.
    pub fn take_undo(&mut self) -> Option<EditAction> {
        let action = self.undo.pop_front()?;
        prepend_bounded(&mut self.redo, action.clone());
        self.notify();
        Some(action)
    }

    /// Move the most recent redoable action back onto the undo stack.
    pub fn take_redo(&mut self) -> Option<EditAction> {
        let action = self.redo.pop_front()?;
        prepend_bounded(&mut self.undo, action.clone());
        self.notify();
        Some(action)
    }

    /// Put an undone action back on the undo stack after it was successfully
    /// re-applied elsewhere.
    pub fn restore_undo(&mut self, action: EditAction) {
        self.redo.retain(|a| a.id != action.id);
        prepend_bounded(&mut self.undo, action);
        self.notify();
    }

    /// Put a redone action back on the redo stack after it was successfully
    /// reverted elsewhere.
    pub fn restore_redo(&mut self, action: EditAction) {
        self.undo.retain(|a| a.id != action.id);
        prepend_bounded(&mut self.redo, action);
        self.notify();
    }

    /// Handle a message posted by another frame.
    ///
    /// Returns `true` if the message was accepted and applied. Messages from a
    /// different origin, with another type tag, or that fail to parse are
    /// dropped.
    pub fn receive(&mut self, origin: &str, payload: &str) -> bool {
        match HistoryMessage::decode(&self.origin, origin, payload) {
            Ok(action) => {
                self.push_inner(action, false);
                true
            }
            Err(e) => {
                log::debug!("Ignoring frame message: {}", e);
                false
            }
        }
    }

    /// Whether there is anything to undo.
    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    /// Whether there is anything to redo.
    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Copy of the current stacks.
    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            undo: self.undo.iter().cloned().collect(),
            redo: self.redo.iter().cloned().collect(),
        }
    }

    /// Register a callback for state changes.
    pub fn subscribe(&mut self, callback: HistoryCallback) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, callback));
        id
    }

    /// Remove a callback. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sid, _)| *sid != id);
        self.subscribers.len() != before
    }

    fn notify(&self) {
        if self.subscribers.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for (_, callback) in &self.subscribers {
            callback(&snapshot);
        }
    }
}

fn prepend_bounded(stack: &mut VecDeque<EditAction>, action: EditAction) {
    stack.push_front(action);
    stack.truncate(HISTORY_LIMIT);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::action::EditChange;
    use crate::history::message::HISTORY_MESSAGE_TYPE;
    use std::sync::{Arc, Mutex};

    const ORIGIN: &str = "https://studio.example.com";

    fn action(n: usize) -> EditAction {
        EditAction {
            id: format!("action-{n}"),
            label: format!("Edit {n}"),
            recorded_at: n as i64,
            change: EditChange::SiteContent {
                key: format!("block.{n}"),
                previous: String::new(),
                next: format!("v{n}"),
                page: None,
            },
        }
    }

    fn ids(actions: &[EditAction]) -> Vec<&str> {
        actions.iter().map(|a| a.id.as_str()).collect()
    }

    #[derive(Clone, Default)]
    struct RecordingChannel {
        posted: Arc<Mutex<Vec<(HistoryMessage, String)>>>,
    }

    impl ParentChannel for RecordingChannel {
        fn post(&self, message: &HistoryMessage, target_origin: &str) {
            self.posted
                .lock()
                .unwrap()
                .push((message.clone(), target_origin.to_string()));
        }
    }

    #[test]
    fn test_history_bound() {
        let mut store = EditHistoryStore::new(ORIGIN);
        for n in 0..60 {
            store.push(action(n));
        }
        let snap = store.snapshot();
        assert_eq!(snap.undo.len(), HISTORY_LIMIT);
        assert_eq!(snap.undo[0].id, "action-59");
        assert_eq!(snap.undo[49].id, "action-10");
    }

    #[test]
    fn test_push_clears_redo() {
        let mut store = EditHistoryStore::new(ORIGIN);
        store.push(action(1));
        store.take_undo();
        assert!(store.can_redo());
        store.push(action(2));
        let snap = store.snapshot();
        assert!(snap.redo.is_empty());
        assert_eq!(ids(&snap.undo), ["action-2"]);
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let mut store = EditHistoryStore::new(ORIGIN);
        store.push(action(1));
        assert_eq!(store.take_undo().map(|a| a.id), Some("action-1".to_string()));
        assert_eq!(store.take_redo().map(|a| a.id), Some("action-1".to_string()));
        let snap = store.snapshot();
        assert_eq!(ids(&snap.undo), ["action-1"]);
        assert!(snap.redo.is_empty());
    }

    #[test]
    fn test_take_on_empty_stacks() {
        let mut store = EditHistoryStore::new(ORIGIN);
        assert!(store.take_undo().is_none());
        assert!(store.take_redo().is_none());
        assert_eq!(store.snapshot(), HistorySnapshot::default());
    }

    #[test]
    fn test_restore_undo_moves_by_identity() {
        let mut store = EditHistoryStore::new(ORIGIN);
        store.push(action(1));
        store.push(action(2));
        let undone = store.take_undo().unwrap();
        let _older = store.take_undo().unwrap();
        assert_eq!(ids(&store.snapshot().redo), ["action-1", "action-2"]);

        store.restore_undo(undone);
        let snap = store.snapshot();
        assert_eq!(ids(&snap.undo), ["action-2"]);
        assert_eq!(ids(&snap.redo), ["action-1"]);
    }

    #[test]
    fn test_restore_redo_moves_by_identity() {
        let mut store = EditHistoryStore::new(ORIGIN);
        store.push(action(1));
        store.push(action(2));
        store.restore_redo(action(1));
        let snap = store.snapshot();
        assert_eq!(ids(&snap.undo), ["action-2"]);
        assert_eq!(ids(&snap.redo), ["action-1"]);
    }

    #[test]
    fn test_nested_push_broadcasts_to_parent() {
        let channel = RecordingChannel::default();
        let mut store = EditHistoryStore::nested(ORIGIN, Box::new(channel.clone()));
        assert!(store.is_nested());
        assert_eq!(store.origin(), ORIGIN);
        assert!(!EditHistoryStore::new(ORIGIN).is_nested());
        store.push(action(1));

        let posted = channel.posted.lock().unwrap();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].0.message_type, HISTORY_MESSAGE_TYPE);
        assert_eq!(posted[0].0.action.id, "action-1");
        assert_eq!(posted[0].1, ORIGIN);
    }

    #[test]
    fn test_received_push_is_not_echoed() {
        let channel = RecordingChannel::default();
        let mut store = EditHistoryStore::nested(ORIGIN, Box::new(channel.clone()));
        let payload = HistoryMessage::push(action(7)).to_json().unwrap();

        assert!(store.receive(ORIGIN, &payload));
        assert_eq!(ids(&store.snapshot().undo), ["action-7"]);
        assert!(channel.posted.lock().unwrap().is_empty());
    }

    #[test]
    fn test_receive_drops_foreign_and_malformed() {
        let mut store = EditHistoryStore::new(ORIGIN);
        let payload = HistoryMessage::push(action(1)).to_json().unwrap();

        assert!(!store.receive("https://elsewhere.example", &payload));
        assert!(!store.receive(ORIGIN, "not json"));
        assert!(!store.receive(ORIGIN, r#"{"type":"other","action":null}"#));
        assert!(!store.can_undo());
    }

    #[test]
    fn test_subscribers_see_every_change() {
        let mut store = EditHistoryStore::new(ORIGIN);
        let seen: Arc<Mutex<Vec<(usize, usize)>>> = Arc::default();
        let sink = seen.clone();
        let id = store.subscribe(Box::new(move |snap| {
            sink.lock().unwrap().push((snap.undo.len(), snap.redo.len()));
        }));

        store.push(action(1));
        store.take_undo();
        store.take_redo();
        assert!(store.unsubscribe(id));
        store.push(action(2));

        assert_eq!(*seen.lock().unwrap(), [(1, 0), (0, 1), (1, 0)]);
        assert!(!store.unsubscribe(id));
    }
}
