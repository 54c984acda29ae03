//! The action a change event requires of the search index.

use crate::index_document::IndexDocument;

/// Outcome of classifying a change event.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexAction {
    /// Insert or replace the document.
    Upsert(IndexDocument),
    /// Remove the document with this identifier.
    Delete(String),
    /// Nothing to do.
    Ignore,
}

impl IndexAction {
    /// Short label for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Upsert(_) => "upsert",
            Self::Delete(_) => "delete",
            Self::Ignore => "ignore",
        }
    }
}
