//! Consumer module for the publication indexer pipeline.
//!
//! Provides change-event consumers that feed the orchestrator.

mod jsonl_consumer;
mod messages;

pub use jsonl_consumer::{ConsumerConfig, JsonLinesConsumer};
pub use messages::StreamMessage;
