//! Index document envelope.
//!
//! Couples the routing metadata the search sink needs (index name and
//! document identifier) with the payload to index. The envelope is allowed to
//! be incomplete while it is being built; the routing accessors fail with a
//! named error when a field is missing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::IndexDocumentError;
use crate::record::Record;

/// Routing metadata consumed by the search sink.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumptionAttributes {
    /// The index the document is written to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_name: Option<String>,
    /// The document's identifier within the index.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_identifier: Option<String>,
}

impl ConsumptionAttributes {
    /// Create attributes with both routing fields set.
    pub fn new(index_name: impl Into<String>, document_identifier: impl Into<String>) -> Self {
        Self {
            index_name: Some(index_name.into()),
            document_identifier: Some(document_identifier.into()),
        }
    }
}

/// A document ready to be handed to the search sink.
///
/// Two documents are equal when their canonical JSON forms are identical.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexDocument {
    /// Routing metadata.
    pub consumption_attributes: ConsumptionAttributes,
    /// The document body.
    pub payload: Value,
}

impl IndexDocument {
    /// Create a new index document.
    pub fn new(consumption_attributes: ConsumptionAttributes, payload: Value) -> Self {
        Self {
            consumption_attributes,
            payload,
        }
    }

    /// Build an index document for a record. The document identifier is
    /// taken from the record and is absent if the record has none.
    pub fn for_record(index_name: impl Into<String>, record: &Record) -> Self {
        Self {
            consumption_attributes: ConsumptionAttributes {
                index_name: Some(index_name.into()),
                document_identifier: record.identifier().map(str::to_string),
            },
            payload: record.document().clone(),
        }
    }

    /// Replace the payload, keeping the routing metadata.
    pub fn with_payload(self, payload: Value) -> Self {
        Self {
            consumption_attributes: self.consumption_attributes,
            payload,
        }
    }

    /// The target index name.
    pub fn index_name(&self) -> Result<&str, IndexDocumentError> {
        self.consumption_attributes
            .index_name
            .as_deref()
            .ok_or(IndexDocumentError::MissingIndexName)
    }

    /// The document identifier within the index.
    pub fn document_identifier(&self) -> Result<&str, IndexDocumentError> {
        self.consumption_attributes
            .document_identifier
            .as_deref()
            .ok_or(IndexDocumentError::MissingIdentifier)
    }

    /// Check that both routing fields are present.
    pub fn validate(&self) -> Result<(), IndexDocumentError> {
        self.index_name()?;
        self.document_identifier()?;
        Ok(())
    }

    /// Serialize to canonical JSON: object keys sorted at every level, no
    /// insignificant whitespace.
    pub fn to_canonical_json(&self) -> Result<String, IndexDocumentError> {
        let value =
            serde_json::to_value(self).map_err(|e| IndexDocumentError::serialization(e.to_string()))?;
        serde_json::to_string(&canonicalize(&value))
            .map_err(|e| IndexDocumentError::serialization(e.to_string()))
    }

    /// Parse a document previously produced by [`IndexDocument::to_canonical_json`].
    pub fn from_canonical_json(json: &str) -> Result<Self, IndexDocumentError> {
        serde_json::from_str(json).map_err(|e| IndexDocumentError::serialization(e.to_string()))
    }
}

impl PartialEq for IndexDocument {
    fn eq(&self, other: &Self) -> bool {
        match (self.to_canonical_json(), other.to_canonical_json()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

/// Return a copy of `value` with the keys of every object sorted.
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::with_capacity(map.len());
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}
