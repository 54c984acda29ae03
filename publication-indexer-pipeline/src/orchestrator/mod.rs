//! Orchestrator module for the publication indexer pipeline.
//!
//! Coordinates the classifier, enricher and sink for single events, batches
//! of events and full reindex runs.

use std::future::Future;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::io::AsyncBufRead;
use tokio::sync::{broadcast, mpsc, Semaphore};
use tracing::{debug, error, info, instrument, warn};

use crate::consumer::{JsonLinesConsumer, StreamMessage};
use crate::enricher::LinkedDataEnricher;
use crate::errors::PipelineError;
use crate::processor::ChangeEventClassifier;
use publication_indexer_repository::{IndexWriter, DEFAULT_INDEX_NAME};
use publication_indexer_shared::{ChangeEvent, IndexAction, IndexDocument, Record};

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Name of the index upserts are routed to.
    pub index_name: String,
    /// Maximum number of events processed at once within a batch.
    pub batch_concurrency: usize,
    /// Size of the message channel buffer used by [`Pipeline::run`].
    pub channel_buffer_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            index_name: DEFAULT_INDEX_NAME.to_string(),
            batch_concurrency: 8,
            channel_buffer_size: 1000,
        }
    }
}

/// What processing a single event did to the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The event required no index change.
    NoOp,
    /// The document with this identifier was written.
    Indexed(String),
    /// The document with this identifier was removed.
    Removed(String),
}

/// A failed item within a batch.
#[derive(Debug, Clone)]
pub struct BatchFailure {
    /// Zero-based position of the item in the input batch.
    pub position: usize,
    /// Identifier of the affected record, when one could be determined.
    pub identifier: Option<String>,
    /// Why the item failed.
    pub error: PipelineError,
}

/// Result of processing a batch. Ignored items count as successes.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    pub succeeded: usize,
    pub failures: Vec<BatchFailure>,
}

impl BatchSummary {
    /// Total number of items accounted for.
    pub fn total(&self) -> usize {
        self.succeeded + self.failures.len()
    }

    fn record(&mut self, position: usize, identifier: Option<String>, result: Result<(), PipelineError>) {
        match result {
            Ok(()) => self.succeeded += 1,
            Err(error) => self.failures.push(BatchFailure {
                position,
                identifier,
                error,
            }),
        }
    }

    fn absorb(&mut self, other: BatchSummary) {
        self.succeeded += other.succeeded;
        self.failures.extend(other.failures);
    }
}

/// Pipeline that keeps the search index in sync with record changes.
pub struct Pipeline {
    classifier: ChangeEventClassifier,
    enricher: LinkedDataEnricher,
    sink: Arc<dyn IndexWriter>,
    config: PipelineConfig,
    shutdown_tx: broadcast::Sender<()>,
}

impl Pipeline {
    /// Create a new pipeline with default configuration.
    pub fn new(enricher: LinkedDataEnricher, sink: Arc<dyn IndexWriter>) -> Self {
        Self::with_config(enricher, sink, PipelineConfig::default())
    }

    /// Create a new pipeline with custom configuration.
    pub fn with_config(
        enricher: LinkedDataEnricher,
        sink: Arc<dyn IndexWriter>,
        config: PipelineConfig,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            classifier: ChangeEventClassifier::new(config.index_name.clone()),
            enricher,
            sink,
            config,
            shutdown_tx,
        }
    }

    /// The pipeline configuration.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Process a single change event end to end.
    ///
    /// # Returns
    ///
    /// * `Ok(Outcome)` - What was done to the index
    /// * `Err(PipelineError)` - Classification, enrichment, validation or
    ///   sink failure; nothing further is attempted for the event
    #[instrument(skip(self, event), fields(change_type = %event.change_type))]
    pub async fn process(&self, event: &ChangeEvent) -> Result<Outcome, PipelineError> {
        match self.classifier.classify(event)? {
            IndexAction::Ignore => {
                debug!("Event requires no index change");
                Ok(Outcome::NoOp)
            }
            IndexAction::Delete(identifier) => {
                self.sink.remove(&identifier).await?;
                info!(identifier = %identifier, "Removed document");
                Ok(Outcome::Removed(identifier))
            }
            IndexAction::Upsert(document) => {
                let document = self.prepare(document).await?;
                let identifier = document.document_identifier()?.to_string();
                self.sink.add(&document).await?;
                info!(identifier = %identifier, "Indexed document");
                Ok(Outcome::Indexed(identifier))
            }
        }
    }

    /// Process a batch of change events concurrently.
    ///
    /// Each event runs in its own task; a failure or panic in one never
    /// affects the others. Individual failures are reported in the summary.
    #[instrument(skip(self, events), fields(count = events.len()))]
    pub async fn process_many(self: &Arc<Self>, events: Vec<ChangeEvent>) -> BatchSummary {
        let permits = Arc::new(Semaphore::new(self.config.batch_concurrency.max(1)));
        let mut handles = Vec::with_capacity(events.len());

        for (position, event) in events.into_iter().enumerate() {
            let identifier = event_identifier(&event);
            let pipeline = Arc::clone(self);
            let permits = Arc::clone(&permits);

            let handle = tokio::spawn(async move {
                let _permit = permits.acquire_owned().await;
                pipeline.process(&event).await.map(|_| ())
            });
            handles.push((position, identifier, handle));
        }

        let mut summary = BatchSummary::default();
        for (position, identifier, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(PipelineError::TaskFailed(e.to_string())),
            };
            if let Err(e) = &result {
                warn!(position, identifier = ?identifier, error = %e, "Event failed");
            }
            summary.record(position, identifier, result);
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failures.len(),
            "Processed batch"
        );
        summary
    }

    /// Rebuild the index from a full set of records.
    ///
    /// Each record is treated as an insert. Eligible records are enriched
    /// concurrently and written through the sink's bulk path; ineligible
    /// records count as successes without touching the index.
    #[instrument(skip(self, records), fields(count = records.len()))]
    pub async fn reindex(&self, records: Vec<Record>) -> BatchSummary {
        let mut summary = BatchSummary::default();
        let mut upserts = Vec::new();

        for (position, record) in records.into_iter().enumerate() {
            let identifier = record.identifier().map(str::to_string);
            match self.classifier.classify(&ChangeEvent::insert(record)) {
                Ok(IndexAction::Upsert(document)) => upserts.push((position, identifier, document)),
                Ok(_) => summary.succeeded += 1,
                Err(e) => summary.record(position, identifier, Err(e)),
            }
        }

        let prepared: Vec<_> = stream::iter(upserts)
            .map(|(position, identifier, document)| async move {
                (position, identifier, self.prepare(document).await)
            })
            .buffered(self.config.batch_concurrency.max(1))
            .collect()
            .await;

        let mut pending = Vec::with_capacity(prepared.len());
        let mut documents = Vec::with_capacity(prepared.len());
        for (position, identifier, result) in prepared {
            match result {
                Ok(document) => {
                    pending.push((position, identifier));
                    documents.push(document);
                }
                Err(e) => summary.record(position, identifier, Err(e)),
            }
        }

        let results: Vec<_> = self
            .sink
            .bulk_add(stream::iter(documents).boxed())
            .collect()
            .await;

        for ((position, identifier), result) in pending.into_iter().zip(results) {
            summary.record(position, identifier, result.map(|_| ()).map_err(PipelineError::from));
        }

        summary.failures.sort_by_key(|failure| failure.position);
        info!(
            succeeded = summary.succeeded,
            failed = summary.failures.len(),
            "Reindex complete"
        );
        summary
    }

    /// Run the pipeline over a change-event stream.
    ///
    /// Blocks until the stream ends or Ctrl-C is received, and returns the
    /// combined summary of every batch processed.
    pub async fn run<R>(
        self: Arc<Self>,
        consumer: JsonLinesConsumer<R>,
    ) -> Result<BatchSummary, PipelineError>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
    {
        let ctrl_c = async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        };
        self.run_until(consumer, ctrl_c).await
    }

    /// Run the pipeline over a change-event stream until it ends or `stop`
    /// completes.
    ///
    /// Stopping is graceful: the consumer is told to shut down and every
    /// batch it flushes on the way out is still processed before returning.
    #[instrument(skip(self, consumer, stop))]
    pub async fn run_until<R, S>(
        self: Arc<Self>,
        consumer: JsonLinesConsumer<R>,
        stop: S,
    ) -> Result<BatchSummary, PipelineError>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        S: Future<Output = ()>,
    {
        info!("Starting publication indexer pipeline");

        let (tx, mut rx) = mpsc::channel::<StreamMessage>(self.config.channel_buffer_size);
        let shutdown_rx = self.shutdown_tx.subscribe();

        let consumer_handle = tokio::spawn(async move {
            if let Err(e) = consumer.run(tx, shutdown_rx).await {
                error!(error = %e, "Consumer error");
            }
        });

        tokio::pin!(stop);
        let mut stopping = false;
        let mut totals = BatchSummary::default();
        loop {
            tokio::select! {
                msg = rx.recv() => {
                    match msg {
                        Some(StreamMessage::Events(events)) => {
                            totals.absorb(self.process_many(events).await);
                        }
                        Some(StreamMessage::Error(e)) => {
                            error!(error = %e, "Received error from consumer");
                        }
                        Some(StreamMessage::End) | None => {
                            info!("Consumer stream ended");
                            break;
                        }
                    }
                }
                _ = &mut stop, if !stopping => {
                    info!("Received shutdown signal, draining consumer");
                    stopping = true;
                    self.shutdown();
                }
            }
        }

        consumer_handle
            .await
            .map_err(|e| PipelineError::TaskFailed(e.to_string()))?;

        info!(
            succeeded = totals.succeeded,
            failed = totals.failures.len(),
            "Pipeline shutdown complete"
        );
        Ok(totals)
    }

    /// Trigger a graceful shutdown.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    async fn prepare(&self, document: IndexDocument) -> Result<IndexDocument, PipelineError> {
        let enriched = self.enricher.enrich(&document.payload).await?;
        let document = document.with_payload(enriched);
        document.validate()?;
        Ok(document)
    }
}

fn event_identifier(event: &ChangeEvent) -> Option<String> {
    event
        .new_record()
        .or(event.old_record())
        .and_then(Record::identifier)
        .map(str::to_string)
}
