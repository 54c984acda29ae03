//! Error types for the publication indexer repository.

mod sink_error;

pub use sink_error::SinkError;
