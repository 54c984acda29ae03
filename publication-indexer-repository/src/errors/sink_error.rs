//! Sink error types.
//!
//! This module defines the errors an index writer can report. They are
//! propagated to the caller unchanged; writers never retry internally.

use publication_indexer_shared::IndexDocumentError;
use thiserror::Error;

/// Errors that can occur while writing to the search index.
#[derive(Debug, Clone, Error)]
pub enum SinkError {
    /// Failed to establish connection to the search engine.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Failed to index a single document.
    #[error("Index error: {0}")]
    IndexError(String),

    /// Bulk indexing request or one of its items failed.
    #[error("Bulk index error: {0}")]
    BulkIndexError(String),

    /// Failed to delete a document.
    #[error("Delete error: {0}")]
    DeleteError(String),

    /// Failed to create the search index.
    #[error("Index creation error: {0}")]
    IndexCreationError(String),

    /// Failed to parse a response from the search engine.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// The document handed to the sink has incomplete routing metadata.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// The call did not complete in time.
    #[error("Timeout: {0}")]
    Timeout(String),
}

impl SinkError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create an index error.
    pub fn index(msg: impl Into<String>) -> Self {
        Self::IndexError(msg.into())
    }

    /// Create a bulk index error.
    pub fn bulk_index(msg: impl Into<String>) -> Self {
        Self::BulkIndexError(msg.into())
    }

    /// Create a delete error.
    pub fn delete(msg: impl Into<String>) -> Self {
        Self::DeleteError(msg.into())
    }

    /// Create an index creation error.
    pub fn index_creation(msg: impl Into<String>) -> Self {
        Self::IndexCreationError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a timeout error.
    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }
}

impl From<IndexDocumentError> for SinkError {
    fn from(err: IndexDocumentError) -> Self {
        Self::InvalidDocument(err.to_string())
    }
}
