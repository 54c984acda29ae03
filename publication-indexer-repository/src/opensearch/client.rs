//! OpenSearch writer implementation.
//!
//! This module provides the concrete implementation of `IndexWriter`
//! using the OpenSearch Rust client.

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use opensearch::{
    cluster::ClusterHealthParts,
    http::request::JsonBody,
    http::transport::{SingleNodeConnectionPool, TransportBuilder},
    indices::{IndicesCreateParts, IndicesExistsParts},
    BulkParts, DeleteParts, IndexParts, OpenSearch,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use crate::config::WriterConfig;
use crate::errors::SinkError;
use crate::interfaces::IndexWriter;
use crate::opensearch::index_config::{get_index_settings, IndexConfig};
use publication_indexer_shared::IndexDocument;

/// OpenSearch writer implementation.
///
/// Documents are written to the index named in their consumption attributes.
/// Removals and index bootstrap target the configured index.
///
/// # Example
///
/// ```ignore
/// use publication_indexer_repository::{IndexConfig, OpenSearchWriter, WriterConfig};
/// let writer = OpenSearchWriter::new(
///     "http://localhost:9200",
///     IndexConfig::new("resources"),
///     WriterConfig::default(),
/// )?;
/// writer.ensure_index_exists().await?;
/// writer.add(&document).await?;
/// ```
pub struct OpenSearchWriter {
    client: OpenSearch,
    index_config: IndexConfig,
    config: WriterConfig,
}

impl OpenSearchWriter {
    /// Create a new OpenSearch writer connected to the specified URL.
    ///
    /// # Arguments
    ///
    /// * `url` - The OpenSearch server URL (e.g., "http://localhost:9200")
    /// * `index_config` - The index removals and bootstrap target
    /// * `config` - Writer tuning
    ///
    /// # Returns
    ///
    /// * `Ok(OpenSearchWriter)` - A new writer instance
    /// * `Err(SinkError)` - If connection setup fails
    pub fn new(
        url: &str,
        index_config: IndexConfig,
        config: WriterConfig,
    ) -> Result<Self, SinkError> {
        let parsed_url = Url::parse(url).map_err(|e| SinkError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let transport = TransportBuilder::new(conn_pool)
            .disable_proxy()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| SinkError::connection(e.to_string()))?;

        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            index = %index_config.index_name,
            bulk_chunk_size = config.bulk_chunk_size,
            request_timeout_ms = config.request_timeout.as_millis() as u64,
            "Created OpenSearch writer"
        );

        Ok(Self {
            client,
            index_config,
            config,
        })
    }

    /// Send one chunk of documents as a single `_bulk` request.
    ///
    /// Documents with incomplete routing metadata are rejected locally and
    /// never sent. The returned vector has one entry per input document, in
    /// input order.
    async fn bulk_chunk(&self, documents: Vec<IndexDocument>) -> Vec<Result<String, SinkError>> {
        let mut results: Vec<Option<Result<String, SinkError>>> = vec![None; documents.len()];
        let mut pending: Vec<(usize, String)> = Vec::with_capacity(documents.len());
        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(documents.len() * 2);

        for (position, document) in documents.into_iter().enumerate() {
            let routing = document.index_name().and_then(|index| {
                document
                    .document_identifier()
                    .map(|id| (index.to_string(), id.to_string()))
            });

            match routing {
                Ok((index, id)) => {
                    body.push(json!({"index": {"_index": index, "_id": id}}).into());
                    body.push(document.payload.into());
                    pending.push((position, id));
                }
                Err(e) => results[position] = Some(Err(e.into())),
            }
        }

        if !pending.is_empty() {
            let sent = self.send_bulk(body).await;
            for (position, outcome) in match_bulk_items(sent, &pending) {
                results[position] = Some(outcome);
            }
        }

        results
            .into_iter()
            .map(|r| r.unwrap_or_else(|| Err(SinkError::bulk_index("No result for document"))))
            .collect()
    }

    async fn send_bulk(&self, body: Vec<JsonBody<Value>>) -> Result<Value, SinkError> {
        let response = self
            .client
            .bulk(BulkParts::None)
            .body(body)
            .send()
            .await
            .map_err(|e| transport_error(e, SinkError::bulk_index))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Bulk request failed");
            return Err(SinkError::bulk_index(format!(
                "Bulk request failed with status {}: {}",
                status, error_body
            )));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| SinkError::parse(e.to_string()))
    }
}

/// Map a client error onto the sink taxonomy. Timeouts are reported as
/// `SinkError::Timeout` whatever the call; other errors use `fallback`.
fn transport_error(err: opensearch::Error, fallback: fn(String) -> SinkError) -> SinkError {
    if err.is_timeout() {
        SinkError::timeout(err.to_string())
    } else {
        fallback(err.to_string())
    }
}

/// Pair the items of a `_bulk` response with the documents that were sent.
///
/// A failed request fails every pending document with the same error.
fn match_bulk_items(
    response: Result<Value, SinkError>,
    pending: &[(usize, String)],
) -> Vec<(usize, Result<String, SinkError>)> {
    let response = match response {
        Ok(response) => response,
        Err(e) => {
            return pending
                .iter()
                .map(|(position, _)| (*position, Err(e.clone())))
                .collect();
        }
    };

    let items = response["items"].as_array().cloned().unwrap_or_default();
    if items.len() != pending.len() {
        warn!(
            expected = pending.len(),
            received = items.len(),
            "Bulk response item count mismatch"
        );
    }

    pending
        .iter()
        .enumerate()
        .map(|(i, (position, id))| {
            let outcome = match items.get(i) {
                None => Err(SinkError::bulk_index(format!("Missing bulk item for {}", id))),
                Some(item) => {
                    let result = &item["index"];
                    let status = result["status"].as_u64().unwrap_or(0);
                    if (200..300).contains(&status) && result.get("error").is_none() {
                        Ok(id.clone())
                    } else {
                        Err(SinkError::bulk_index(format!(
                            "Document {} failed with status {}: {}",
                            id, status, result["error"]
                        )))
                    }
                }
            };
            (*position, outcome)
        })
        .collect()
}

#[async_trait]
impl IndexWriter for OpenSearchWriter {
    #[instrument(skip(self, document))]
    async fn add(&self, document: &IndexDocument) -> Result<(), SinkError> {
        let index = document.index_name()?;
        let id = document.document_identifier()?;

        let response = self
            .client
            .index(IndexParts::IndexId(index, id))
            .body(&document.payload)
            .send()
            .await
            .map_err(|e| transport_error(e, SinkError::index))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Index request failed");
            return Err(SinkError::index(format!(
                "Index failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(index = %index, id = %id, "Document indexed");
        Ok(())
    }

    /// Delete a document from the configured index.
    ///
    /// If the document doesn't exist, the operation is considered successful.
    #[instrument(skip(self))]
    async fn remove(&self, identifier: &str) -> Result<(), SinkError> {
        let response = self
            .client
            .delete(DeleteParts::IndexId(&self.index_config.index_name, identifier))
            .send()
            .await
            .map_err(|e| transport_error(e, SinkError::delete))?;

        let status = response.status_code();

        // 404 is acceptable - document may not exist
        if !status.is_success() && status.as_u16() != 404 {
            let error_body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %error_body, "Delete request failed");
            return Err(SinkError::delete(format!(
                "Delete failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(id = %identifier, "Document deleted");
        Ok(())
    }

    fn bulk_add<'a>(
        &'a self,
        documents: BoxStream<'a, IndexDocument>,
    ) -> BoxStream<'a, Result<String, SinkError>> {
        documents
            .chunks(self.config.bulk_chunk_size.max(1))
            .then(move |chunk| self.bulk_chunk(chunk))
            .flat_map(stream::iter)
            .boxed()
    }

    async fn ensure_index_exists(&self) -> Result<(), SinkError> {
        let index = self.index_config.index_name.as_str();

        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| transport_error(e, SinkError::connection))?;

        if response.status_code().is_success() {
            debug!(index = %index, "Index already exists");
            return Ok(());
        }

        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(get_index_settings())
            .send()
            .await
            .map_err(|e| transport_error(e, SinkError::index_creation))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SinkError::index_creation(format!(
                "Index creation failed with status {}: {}",
                status, error_body
            )));
        }

        info!(index = %index, "Created search index");
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, SinkError> {
        let response = self
            .client
            .cluster()
            .health(ClusterHealthParts::None)
            .send()
            .await
            .map_err(|e| transport_error(e, SinkError::connection))?;

        if !response.status_code().is_success() {
            return Ok(false);
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| SinkError::parse(e.to_string()))?;

        Ok(body["status"].as_str().is_some_and(|s| s != "red"))
    }
}
