//! # Publication Indexer Pipeline
//!
//! This crate provides the pipeline components that keep the search index in
//! sync with the canonical record store.
//!
//! ## Architecture
//!
//! 1. **Consumer**: Receives change events
//! 2. **Processor**: Classifies each event as upsert, delete or ignore
//! 3. **Enricher**: Inlines external reference documents into the record
//! 4. **Orchestrator**: Coordinates the flow and hands documents to the sink

pub mod consumer;
pub mod enricher;
pub mod errors;
pub mod orchestrator;
pub mod processor;

pub use errors::PipelineError;
