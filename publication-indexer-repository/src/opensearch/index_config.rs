//! OpenSearch index configuration and mappings.
//!
//! This module defines the index settings and mappings for the published
//! resources index.

use serde_json::{json, Value};

/// The default name of the search index.
pub const DEFAULT_INDEX_NAME: &str = "resources";

/// Index configuration for the OpenSearch writer.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Name of the index that removals and bootstrap target.
    pub index_name: String,
}

impl IndexConfig {
    /// Create a configuration for the given index name.
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_NAME)
    }
}

/// Get the index settings and mappings for the resources index.
///
/// Only the fields the indexer relies on are mapped explicitly; the rest of
/// the enriched payload is mapped dynamically. Inlined context names are
/// mapped as text with a keyword sub-field for aggregations.
pub fn get_index_settings() -> Value {
    let context_name = json!({
        "properties": {
            "id": { "type": "keyword" },
            "name": {
                "type": "text",
                "fields": { "raw": { "type": "keyword" } }
            }
        }
    });

    json!({
        "settings": {
            "number_of_shards": 1,
            "number_of_replicas": 1
        },
        "mappings": {
            "properties": {
                "identifier": { "type": "keyword" },
                "status": { "type": "keyword" },
                "publicationType": { "type": "keyword" },
                "title": {
                    "type": "text",
                    "fields": { "raw": { "type": "keyword" } }
                },
                "context": {
                    "properties": {
                        "journal": context_name.clone(),
                        "publisher": context_name.clone(),
                        "series": context_name
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_settings_structure() {
        let settings = get_index_settings();

        assert!(settings["settings"]["number_of_shards"].is_number());
        assert!(settings["settings"]["number_of_replicas"].is_number());

        let properties = &settings["mappings"]["properties"];
        assert_eq!(properties["identifier"]["type"], "keyword");
        assert_eq!(properties["title"]["type"], "text");
        assert_eq!(
            properties["context"]["properties"]["journal"]["properties"]["name"]["type"],
            "text"
        );
        assert!(properties["context"]["properties"]["series"].is_object());
    }

    #[test]
    fn test_default_index_name() {
        assert_eq!(IndexConfig::default().index_name, "resources");
    }
}
