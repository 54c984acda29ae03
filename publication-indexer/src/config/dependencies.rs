//! Dependency initialization and wiring for the publication indexer.

use std::sync::Arc;
use tracing::info;

use crate::config::Settings;
use crate::IndexingError;
use publication_indexer_pipeline::{
    enricher::{EnricherConfig, Frame, HttpReferenceFetcher, LinkedDataEnricher},
    orchestrator::{Pipeline, PipelineConfig},
};
use publication_indexer_repository::{IndexConfig, IndexWriter, OpenSearchWriter, WriterConfig};

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured pipeline ready to run.
    pub pipeline: Arc<Pipeline>,
}

impl Dependencies {
    /// Initialize all dependencies from the given settings.
    ///
    /// Loads the frame, connects to OpenSearch, verifies the cluster is
    /// healthy and makes sure the target index exists.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If initialization fails
    pub async fn new(settings: &Settings) -> Result<Self, IndexingError> {
        info!(
            opensearch_url = %settings.opensearch_url,
            index_name = %settings.index_name,
            frame_path = ?settings.frame_path,
            "Initializing dependencies"
        );

        let frame = match &settings.frame_path {
            Some(path) => Frame::load(path),
            None => Frame::bundled(),
        }
        .map_err(|e| IndexingError::config(format!("Failed to load frame: {}", e)))?;

        // Initialize OpenSearch writer
        let writer = OpenSearchWriter::new(
            &settings.opensearch_url,
            IndexConfig::new(settings.index_name.clone()),
            WriterConfig::default().request_timeout(settings.sink_timeout),
        )
        .map_err(|e| IndexingError::config(format!("Failed to create OpenSearch writer: {}", e)))?;

        // Verify OpenSearch is reachable
        let healthy = writer
            .health_check()
            .await
            .map_err(|e| IndexingError::config(format!("OpenSearch health check failed: {}", e)))?;

        if !healthy {
            return Err(IndexingError::config("OpenSearch cluster is unhealthy"));
        }

        writer.ensure_index_exists().await?;

        info!("OpenSearch connection verified");

        let fetcher = HttpReferenceFetcher::new(settings.fetch_timeout).map_err(|e| {
            IndexingError::config(format!("Failed to create reference fetcher: {}", e))
        })?;

        let enricher = LinkedDataEnricher::with_config(
            Arc::new(fetcher),
            Arc::new(frame),
            EnricherConfig {
                fetch_timeout: settings.fetch_timeout,
                fetch_concurrency: settings.fetch_concurrency,
                ..EnricherConfig::default()
            },
        );

        let pipeline = Pipeline::with_config(
            enricher,
            Arc::new(writer),
            PipelineConfig {
                index_name: settings.index_name.clone(),
                batch_concurrency: settings.batch_concurrency,
                ..PipelineConfig::default()
            },
        );

        Ok(Self {
            pipeline: Arc::new(pipeline),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreadable_frame_is_config_error() {
        let settings = Settings::from_lookup(|name| match name {
            "FRAME_PATH" => Some("/nonexistent/frame.json".to_string()),
            _ => None,
        })
        .unwrap();

        match Dependencies::new(&settings).await {
            Err(IndexingError::ConfigError(msg)) => assert!(msg.contains("frame")),
            Err(other) => panic!("expected config error, got {:?}", other),
            Ok(_) => panic!("expected config error"),
        }
    }
}
