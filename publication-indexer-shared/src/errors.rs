//! Error types for the index document envelope.

use thiserror::Error;

/// Errors raised when an index document envelope is incomplete or cannot be
/// serialized.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexDocumentError {
    /// The consumption attributes carry no index name.
    #[error("Index document is missing an index name")]
    MissingIndexName,

    /// The consumption attributes carry no document identifier.
    #[error("Index document is missing a document identifier")]
    MissingIdentifier,

    /// Failed to serialize or parse the canonical form.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl IndexDocumentError {
    /// Create a serialization error.
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}
