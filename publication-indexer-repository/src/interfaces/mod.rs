//! Interface definitions for the search index sink.
//!
//! This module defines the abstract `IndexWriter` trait that allows for
//! dependency injection and swappable search backend implementations.

mod index_writer;

pub use index_writer::IndexWriter;
