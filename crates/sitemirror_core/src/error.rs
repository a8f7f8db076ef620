//! Error types for the core crate.

use thiserror::Error;

/// Failure while turning a dataset into snapshot artifacts.
#[derive(Debug, Error)]
pub enum SerializeError {
    /// A collection could not be encoded.
    #[error("failed to encode {artifact}: {source}")]
    Encode {
        /// Name of the artifact being produced.
        artifact: &'static str,
        /// Underlying encoder error.
        #[source]
        source: serde_json::Error,
    },
}

/// Failure while decoding a cross-frame history message.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// The sender's origin does not match ours.
    #[error("message origin {received} does not match {expected}")]
    OriginMismatch {
        /// Origin we accept.
        expected: String,
        /// Origin the message came from.
        received: String,
    },
    /// The payload is not a history message.
    #[error("malformed history message: {0}")]
    Malformed(#[from] serde_json::Error),
    /// The payload carries a different message type tag.
    #[error("unexpected message type {0:?}")]
    UnexpectedType(String),
}
