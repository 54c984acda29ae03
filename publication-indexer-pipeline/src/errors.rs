//! Error types for the publication indexer pipeline.

use publication_indexer_repository::SinkError;
use publication_indexer_shared::IndexDocumentError;
use thiserror::Error;

/// Errors that can occur while processing a change event.
#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    /// The change-type tag is not one of INSERT, MODIFY or REMOVE.
    #[error("Invalid change type: {0}")]
    InvalidChangeType(String),

    /// Neither the old nor the new record carries an identifier.
    #[error("Change event has no old or new record")]
    EmptyChangeEvent,

    /// The index document envelope is incomplete.
    #[error("Document error: {0}")]
    Document(#[from] IndexDocumentError),

    /// The base record could not be framed.
    #[error("Framing failure: {0}")]
    FramingFailure(String),

    /// Error from the search sink.
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// Error from the consumer component.
    #[error("Consumer error: {0}")]
    ConsumerError(String),

    /// Channel communication error.
    #[error("Channel error: {0}")]
    ChannelError(String),

    /// A worker task panicked or was cancelled.
    #[error("Task failed: {0}")]
    TaskFailed(String),
}

impl PipelineError {
    /// Create a framing failure.
    pub fn framing(msg: impl Into<String>) -> Self {
        Self::FramingFailure(msg.into())
    }

    /// Create a consumer error.
    pub fn consumer(msg: impl Into<String>) -> Self {
        Self::ConsumerError(msg.into())
    }
}
