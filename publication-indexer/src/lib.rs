//! # Publication Indexer
//!
//! Main library for the publication search indexer.
//!
//! This crate provides the entry point and configuration for running
//! the indexing pipeline.

pub mod config;

pub use config::{Dependencies, Settings};

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] publication_indexer_pipeline::PipelineError),

    /// Sink error.
    #[error("Sink error: {0}")]
    SinkError(#[from] publication_indexer_repository::SinkError),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
