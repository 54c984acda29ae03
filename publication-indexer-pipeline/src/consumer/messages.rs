//! Message types for the consumer.
//!
//! Defines the messages that flow from a consumer to the orchestrator.

use publication_indexer_shared::ChangeEvent;

/// Messages that flow through the pipeline.
#[derive(Debug)]
pub enum StreamMessage {
    /// A batch of change events.
    Events(Vec<ChangeEvent>),
    /// Stream has ended.
    End,
    /// An error occurred.
    Error(String),
}
