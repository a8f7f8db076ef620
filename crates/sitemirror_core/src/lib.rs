//! # `sitemirror_core`
//!
//! Shared, runtime-independent pieces of the site editor's persistence layer.
//!
//! There are two consumers right now:
//! 1. The admin server (`sitemirror_server`), which captures the editable
//!    dataset, serializes it into snapshot artifacts and mirrors them into git.
//! 2. The in-page editor, which keeps an undo/redo log that is replicated
//!    between the editor iframe and its hosting window.
//!
//! Nothing in here touches the filesystem, the network or an async runtime.

#![warn(missing_docs)]

/// Dataset docs
pub mod dataset;

/// Error docs
pub mod error;

pub mod history;
pub mod snapshot;

pub use dataset::SnapshotDataset;
pub use error::{HistoryError, SerializeError};
pub use history::{EditAction, EditChange, EditHistoryStore, HistorySnapshot, ImageValue};
pub use snapshot::{SnapshotArtifact, serialize};
