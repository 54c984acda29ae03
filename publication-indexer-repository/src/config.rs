//! Configuration types for index writers.

use std::time::Duration;

/// Default time allowed for a single request to the search engine.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for an index writer.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    /// Maximum number of documents sent in a single bulk request.
    pub bulk_chunk_size: usize,
    /// Time allowed for a single request, from connect until the response
    /// body has been read.
    pub request_timeout: Duration,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            bulk_chunk_size: 500,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

impl WriterConfig {
    /// Create a config with a custom bulk chunk size. A size of zero is
    /// treated as one.
    pub fn with_bulk_chunk_size(bulk_chunk_size: usize) -> Self {
        Self {
            bulk_chunk_size: bulk_chunk_size.max(1),
            ..Self::default()
        }
    }

    /// Replace the request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}
