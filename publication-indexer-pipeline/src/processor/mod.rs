//! Processor module for the publication indexer pipeline.
//!
//! Decides what a change event requires of the search index.

mod change_classifier;

pub use change_classifier::ChangeEventClassifier;
