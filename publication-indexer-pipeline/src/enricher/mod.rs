//! Enricher module for the publication indexer pipeline.
//!
//! Resolves the external references embedded in a record and merges them
//! into one framed document.

mod fetcher;
mod frame;

pub use fetcher::{FetchError, HttpReferenceFetcher, ReferenceFetcher, LINKED_DATA_MEDIA_TYPE};
pub use frame::{Frame, FramingError, FramingOptions, DEFAULT_FRAME};

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use crate::errors::PipelineError;

/// Positions of reference URIs inside a record: the journal, publisher and
/// series a publication appeared in.
pub const DEFAULT_REFERENCE_POINTERS: [&str; 3] = [
    "/context/journal/id",
    "/context/publisher/id",
    "/context/series/id",
];

/// Configuration for the linked-data enricher.
#[derive(Debug, Clone)]
pub struct EnricherConfig {
    /// Time allowed for a single reference fetch.
    pub fetch_timeout: Duration,
    /// Maximum number of reference fetches in flight per enrichment.
    pub fetch_concurrency: usize,
    /// JSON pointers to the reference URIs inside a record.
    pub reference_pointers: Vec<String>,
    /// Shape of the framed output.
    pub framing: FramingOptions,
}

impl Default for EnricherConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            fetch_concurrency: 4,
            reference_pointers: DEFAULT_REFERENCE_POINTERS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            framing: FramingOptions::default(),
        }
    }
}

/// An external reference and, if the fetch succeeded, its document.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalReference {
    /// The referenced URI.
    pub uri: Url,
    /// The identifiers the base uses for this URI, as written. Several
    /// spellings may normalize to the same URI.
    pub identifiers: BTreeSet<String>,
    /// The fetched document, `None` if the fetch failed.
    pub fragment: Option<Value>,
}

/// Enriches records with the documents their references point to.
///
/// The frame is shared read-only between all enrichment calls. Fetched
/// documents are not cached across calls.
pub struct LinkedDataEnricher {
    fetcher: Arc<dyn ReferenceFetcher>,
    frame: Arc<Frame>,
    config: EnricherConfig,
}

impl LinkedDataEnricher {
    /// Create a new enricher with default configuration.
    pub fn new(fetcher: Arc<dyn ReferenceFetcher>, frame: Arc<Frame>) -> Self {
        Self::with_config(fetcher, frame, EnricherConfig::default())
    }

    /// Create a new enricher with custom configuration.
    pub fn with_config(
        fetcher: Arc<dyn ReferenceFetcher>,
        frame: Arc<Frame>,
        config: EnricherConfig,
    ) -> Self {
        Self {
            fetcher,
            frame,
            config,
        }
    }

    /// Collect the distinct HTTP(S) reference URIs found at the configured
    /// positions of `base`, each with the identifiers it is written as.
    pub fn discover_references(&self, base: &Value) -> BTreeMap<Url, BTreeSet<String>> {
        let mut references: BTreeMap<Url, BTreeSet<String>> = BTreeMap::new();

        let raw_values = self
            .config
            .reference_pointers
            .iter()
            .filter_map(|pointer| base.pointer(pointer))
            .filter_map(Value::as_str);

        for raw in raw_values {
            match Url::parse(raw) {
                Ok(uri) if matches!(uri.scheme(), "http" | "https") => {
                    references.entry(uri).or_default().insert(raw.to_string());
                }
                _ => debug!(value = %raw, "Ignoring non-HTTP reference"),
            }
        }

        references
    }

    /// Fetch every URI once, concurrently. Failed fetches yield a reference
    /// with no fragment and a warning.
    pub async fn resolve(
        &self,
        references: BTreeMap<Url, BTreeSet<String>>,
    ) -> Vec<ExternalReference> {
        let limit = self.config.fetch_concurrency.max(1);

        stream::iter(references)
            .map(|(uri, identifiers)| async move {
                let fragment = self.fetch_one(&uri).await;
                ExternalReference {
                    uri,
                    identifiers,
                    fragment,
                }
            })
            .buffer_unordered(limit)
            .collect()
            .await
    }

    /// Enrich `base` with its external references and frame the result.
    ///
    /// # Returns
    ///
    /// * `Ok(Value)` - The framed document
    /// * `Err(PipelineError::FramingFailure)` - If `base` is not a usable
    ///   document or framing fails; individual fetch failures never fail
    ///   enrichment
    #[instrument(skip(self, base))]
    pub async fn enrich(&self, base: &Value) -> Result<Value, PipelineError> {
        if !base.is_object() {
            return Err(PipelineError::framing("base document is not a JSON object"));
        }

        let discovered = self.discover_references(base);
        let reference_count = discovered.len();
        let references = self.resolve(discovered).await;

        let mut fragments: Vec<Value> = Vec::new();
        for reference in references {
            let Some(fragment) = reference.fragment else {
                continue;
            };
            if !has_nodes(&fragment) {
                warn!(uri = %reference.uri, "Dropping reference with no JSON-LD nodes");
                continue;
            }
            for identifier in &reference.identifiers {
                fragments.push(identify(fragment.clone(), identifier));
            }
        }

        debug!(
            references = reference_count,
            resolved = fragments.len(),
            "Resolved external references"
        );

        self.frame
            .apply(base, &fragments, self.config.framing)
            .map_err(|e| PipelineError::framing(e.to_string()))
    }

    async fn fetch_one(&self, uri: &Url) -> Option<Value> {
        let result = tokio::time::timeout(self.config.fetch_timeout, self.fetcher.fetch(uri))
            .await
            .unwrap_or(Err(FetchError::Timeout));

        match result {
            Ok(fragment) => Some(fragment),
            Err(e) => {
                warn!(uri = %uri, error = %e, "Dropping unresolvable reference");
                None
            }
        }
    }
}

/// Whether a fetched document holds anything framing can use as a node.
fn has_nodes(fragment: &Value) -> bool {
    match fragment {
        Value::Object(_) => true,
        Value::Array(members) => members.iter().any(Value::is_object),
        _ => false,
    }
}

/// A fetched document is the node its URI names. Single-node fragments are
/// given the identifier the base refers to them by, so the reference in the
/// base can find them.
fn identify(mut fragment: Value, identifier: &str) -> Value {
    if let Some(node) = fragment.as_object_mut() {
        if !node.contains_key("@graph") {
            node.remove("@id");
            node.insert("id".to_string(), Value::String(identifier.to_string()));
        }
    }
    fragment
}
