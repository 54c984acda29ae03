//! # Publication Indexer Repository
//!
//! This crate provides the write-side interface to the search engine. It
//! includes definitions for errors, the `IndexWriter` sink trait, and a
//! concrete implementation for OpenSearch.

pub mod config;
pub mod errors;
pub mod interfaces;
pub mod opensearch;

pub use config::WriterConfig;
pub use errors::SinkError;
pub use interfaces::IndexWriter;
pub use opensearch::{IndexConfig, OpenSearchWriter, DEFAULT_INDEX_NAME};
