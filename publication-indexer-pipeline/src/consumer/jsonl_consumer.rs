//! JSON-lines consumer implementation.
//!
//! Reads one change event per line from any buffered async reader (stdin,
//! a file, a socket) and forwards them to the pipeline in batches.

use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, instrument, warn};

use crate::consumer::messages::StreamMessage;
use crate::errors::PipelineError;
use publication_indexer_shared::ChangeEvent;

/// Configuration for the JSON-lines consumer.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Number of events to collect before sending a batch.
    pub batch_size: usize,
    /// Maximum time a partial batch waits before it is sent.
    pub flush_interval: Duration,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            flush_interval: Duration::from_millis(1000),
        }
    }
}

/// Consumer for newline-delimited JSON change events.
pub struct JsonLinesConsumer<R> {
    reader: R,
    config: ConsumerConfig,
}

impl<R> JsonLinesConsumer<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    /// Create a new consumer over `reader`.
    pub fn new(reader: R) -> Self {
        Self::with_config(reader, ConsumerConfig::default())
    }

    /// Create a new consumer with custom configuration.
    pub fn with_config(reader: R, config: ConsumerConfig) -> Self {
        Self { reader, config }
    }

    /// Read events until end of input or shutdown, sending them through the
    /// channel. Lines that are not valid change events are reported as
    /// `StreamMessage::Error` and skipped.
    #[instrument(skip(self, sender, shutdown))]
    pub async fn run(
        self,
        sender: mpsc::Sender<StreamMessage>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), PipelineError> {
        let batch_size = self.config.batch_size.max(1);
        let mut lines = self.reader.lines();
        let mut batch: Vec<ChangeEvent> = Vec::with_capacity(batch_size);
        let mut line_number: u64 = 0;
        let mut flush_timer = tokio::time::interval(self.config.flush_interval);

        loop {
            tokio::select! {
                _ = shutdown.recv() => {
                    info!("Consumer received shutdown signal");
                    send_batch(&sender, &mut batch).await?;
                    let _ = sender.send(StreamMessage::End).await;
                    break;
                }
                _ = flush_timer.tick() => {
                    send_batch(&sender, &mut batch).await?;
                }
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            line_number += 1;
                            if line.trim().is_empty() {
                                continue;
                            }
                            match serde_json::from_str::<ChangeEvent>(&line) {
                                Ok(event) => {
                                    batch.push(event);
                                    if batch.len() >= batch_size {
                                        send_batch(&sender, &mut batch).await?;
                                    }
                                }
                                Err(e) => {
                                    warn!(line = line_number, error = %e, "Skipping malformed change event");
                                    send(&sender, StreamMessage::Error(format!(
                                        "line {}: {}",
                                        line_number, e
                                    )))
                                    .await?;
                                }
                            }
                        }
                        Ok(None) => {
                            info!(lines = line_number, "Input stream ended");
                            send_batch(&sender, &mut batch).await?;
                            let _ = sender.send(StreamMessage::End).await;
                            break;
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to read input");
                            send_batch(&sender, &mut batch).await?;
                            let _ = sender.send(StreamMessage::End).await;
                            return Err(PipelineError::consumer(e.to_string()));
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

async fn send_batch(
    sender: &mpsc::Sender<StreamMessage>,
    batch: &mut Vec<ChangeEvent>,
) -> Result<(), PipelineError> {
    if batch.is_empty() {
        return Ok(());
    }
    let events = std::mem::take(batch);
    debug!(count = events.len(), "Sending change event batch");
    send(sender, StreamMessage::Events(events)).await
}

async fn send(
    sender: &mpsc::Sender<StreamMessage>,
    message: StreamMessage,
) -> Result<(), PipelineError> {
    sender
        .send(message)
        .await
        .map_err(|e| PipelineError::ChannelError(e.to_string()))
}
