//! Index writer trait definition.
//!
//! This module defines the abstract write interface to the search engine,
//! allowing for different backend implementations (OpenSearch, mocks, etc.).

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};

use crate::errors::SinkError;
use publication_indexer_shared::IndexDocument;

/// Abstract interface for writing documents to the search index.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// Failures are reported as `SinkError` and are never retried by the writer.
/// A request that exceeds the writer's timeout surfaces as `SinkError::Timeout`.
#[async_trait]
pub trait IndexWriter: Send + Sync {
    /// Insert or replace a single document.
    ///
    /// The target index and document ID are read from the document's
    /// consumption attributes.
    ///
    /// # Returns
    ///
    /// * `Ok(())` - If the document was indexed successfully
    /// * `Err(SinkError::InvalidDocument)` - If routing metadata is missing
    /// * `Err(SinkError)` - If indexing fails
    async fn add(&self, document: &IndexDocument) -> Result<(), SinkError>;

    /// Remove the document with the given identifier.
    ///
    /// Removing a document that does not exist is not an error.
    async fn remove(&self, identifier: &str) -> Result<(), SinkError>;

    /// Index a stream of documents, yielding one result per document in
    /// input order: the document identifier on success, the error otherwise.
    ///
    /// The default implementation calls [`IndexWriter::add`] for each
    /// document. Backends with a native bulk API should override it.
    fn bulk_add<'a>(
        &'a self,
        documents: BoxStream<'a, IndexDocument>,
    ) -> BoxStream<'a, Result<String, SinkError>> {
        documents
            .then(move |document| async move {
                let identifier = document.document_identifier()?.to_string();
                self.add(&document).await?;
                Ok::<_, SinkError>(identifier)
            })
            .boxed()
    }

    /// Ensure the target index exists, creating it with mappings if needed.
    async fn ensure_index_exists(&self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Check if the search engine is healthy and reachable.
    async fn health_check(&self) -> Result<bool, SinkError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use publication_indexer_shared::ConsumptionAttributes;
    use serde_json::json;
    use tokio::sync::Mutex;

    /// Writer that relies on the default bulk implementation.
    struct RecordingWriter {
        added: Mutex<Vec<String>>,
        fail_on: Option<String>,
    }

    #[async_trait]
    impl IndexWriter for RecordingWriter {
        async fn add(&self, document: &IndexDocument) -> Result<(), SinkError> {
            let id = document.document_identifier()?.to_string();
            if self.fail_on.as_deref() == Some(id.as_str()) {
                return Err(SinkError::index("Mock failure"));
            }
            self.added.lock().await.push(id);
            Ok(())
        }

        async fn remove(&self, _identifier: &str) -> Result<(), SinkError> {
            Ok(())
        }
    }

    fn doc(id: Option<&str>) -> IndexDocument {
        IndexDocument::new(
            ConsumptionAttributes {
                index_name: Some("resources".to_string()),
                document_identifier: id.map(str::to_string),
            },
            json!({}),
        )
    }

    #[tokio::test]
    async fn test_default_bulk_add_reports_per_document() {
        let writer = RecordingWriter {
            added: Mutex::new(Vec::new()),
            fail_on: Some("b".to_string()),
        };

        let documents = vec![doc(Some("a")), doc(Some("b")), doc(None), doc(Some("c"))];
        let results: Vec<Result<String, SinkError>> = writer
            .bulk_add(futures::stream::iter(documents).boxed())
            .collect()
            .await;

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].as_ref().unwrap(), "a");
        assert!(matches!(results[1], Err(SinkError::IndexError(_))));
        assert!(matches!(results[2], Err(SinkError::InvalidDocument(_))));
        assert_eq!(results[3].as_ref().unwrap(), "c");
        assert_eq!(*writer.added.lock().await, vec!["a", "c"]);
    }
}
