//! Record type.
//!
//! A record is the document stored in the canonical record store. Its body is
//! kept as an opaque JSON value; the fields the indexer relies on are read
//! through typed accessors that return `None` rather than guessing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

const IDENTIFIER_FIELD: &str = "identifier";
const STATUS_FIELD: &str = "status";
const TITLE_FIELD: &str = "title";
const PUBLICATION_TYPE_FIELD: &str = "publicationType";

/// Lifecycle status of a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublicationStatus {
    /// Visible to the public and eligible for the index.
    Published,
    /// Work in progress.
    Draft,
    /// Previously published, withdrawn from public view.
    Unpublished,
    /// Marked as deleted in the record store.
    Deleted,
    /// Any status the indexer does not know about.
    Other(String),
}

impl PublicationStatus {
    /// Parse a raw status value. Matching is case-insensitive.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PUBLISHED" => Self::Published,
            "DRAFT" => Self::Draft,
            "UNPUBLISHED" => Self::Unpublished,
            "DELETED" => Self::Deleted,
            _ => Self::Other(raw.to_string()),
        }
    }
}

/// A record from the canonical store.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Value);

impl Record {
    /// Wrap a JSON document as a record.
    pub fn new(document: Value) -> Self {
        Self(document)
    }

    /// The record's identifier, if it has a non-blank one.
    pub fn identifier(&self) -> Option<&str> {
        self.non_blank_str(IDENTIFIER_FIELD)
    }

    /// The record's status, if present.
    pub fn status(&self) -> Option<PublicationStatus> {
        self.0
            .get(STATUS_FIELD)
            .and_then(Value::as_str)
            .map(PublicationStatus::parse)
    }

    /// The record's title, if it has a non-blank one.
    pub fn title(&self) -> Option<&str> {
        self.non_blank_str(TITLE_FIELD)
    }

    /// The record's publication type, if it has a non-blank one.
    pub fn publication_type(&self) -> Option<&str> {
        self.non_blank_str(PUBLICATION_TYPE_FIELD)
    }

    /// Whether the record is in the published state.
    pub fn is_published(&self) -> bool {
        matches!(self.status(), Some(PublicationStatus::Published))
    }

    /// A record without an identifier carries nothing the index can address.
    pub fn is_empty(&self) -> bool {
        self.identifier().is_none()
    }

    /// Borrow the underlying document.
    pub fn document(&self) -> &Value {
        &self.0
    }

    /// Consume the record and return the underlying document.
    pub fn into_document(self) -> Value {
        self.0
    }

    fn non_blank_str(&self, field: &str) -> Option<&str> {
        self.0
            .get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

impl From<Value> for Record {
    fn from(document: Value) -> Self {
        Self(document)
    }
}
