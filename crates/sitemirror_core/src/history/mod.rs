//! Edit history shared between the editor iframe and its hosting window.
//!
//! ```text
//! ┌──────────────────────┐  HistoryMessage   ┌──────────────────────┐
//! │ editor iframe        │ ────────────────▶ │ host window          │
//! │ EditHistoryStore     │  (post, origin-   │ EditHistoryStore     │
//! │ (nested, broadcasts) │   restricted)     │ (receive, no echo)   │
//! └──────────────────────┘                   └──────────────────────┘
//! ```

mod action;
mod message;
mod store;

pub use action::{EditAction, EditChange, ImageValue};
pub use message::{HISTORY_MESSAGE_TYPE, HistoryMessage};
pub use store::{
    EditHistoryStore, HISTORY_LIMIT, HistoryCallback, HistorySnapshot, ParentChannel,
    SubscriptionId,
};
