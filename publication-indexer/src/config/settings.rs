//! Environment settings for the publication indexer.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::IndexingError;
use publication_indexer_repository::DEFAULT_INDEX_NAME;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default per-reference fetch timeout in milliseconds.
const DEFAULT_FETCH_TIMEOUT_MS: u64 = 10_000;

/// Default time allowed for a single OpenSearch request in milliseconds.
const DEFAULT_SINK_TIMEOUT_MS: u64 = 30_000;

/// Default number of references fetched at once.
const DEFAULT_FETCH_CONCURRENCY: usize = 4;

/// Default number of events processed at once within a batch.
const DEFAULT_BATCH_CONCURRENCY: usize = 8;

/// Settings read from the environment at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub opensearch_url: String,
    pub index_name: String,
    /// Frame file overriding the bundled frame.
    pub frame_path: Option<PathBuf>,
    pub fetch_timeout: Duration,
    pub sink_timeout: Duration,
    pub fetch_concurrency: usize,
    pub batch_concurrency: usize,
    /// Emit logs as JSON lines.
    pub json_logs: bool,
}

impl Settings {
    /// Read settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `INDEX_NAME`: Target index (default: resources)
    /// - `FRAME_PATH`: Frame file; the bundled frame is used when unset
    /// - `FETCH_TIMEOUT_MS`: Per-reference fetch timeout (default: 10000)
    /// - `SINK_TIMEOUT_MS`: Per-request OpenSearch timeout (default: 30000)
    /// - `FETCH_CONCURRENCY`: References fetched at once (default: 4)
    /// - `BATCH_CONCURRENCY`: Events processed at once (default: 8)
    /// - `LOG_FORMAT`: `json` for JSON logs, anything else for text
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Read settings through `lookup`, which returns the raw value of a
    /// variable if it is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, IndexingError> {
        let value = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let fetch_timeout_ms: u64 =
            parse_var("FETCH_TIMEOUT_MS", value("FETCH_TIMEOUT_MS"), DEFAULT_FETCH_TIMEOUT_MS)?;
        let sink_timeout_ms: u64 =
            parse_var("SINK_TIMEOUT_MS", value("SINK_TIMEOUT_MS"), DEFAULT_SINK_TIMEOUT_MS)?;
        let fetch_concurrency = parse_var(
            "FETCH_CONCURRENCY",
            value("FETCH_CONCURRENCY"),
            DEFAULT_FETCH_CONCURRENCY,
        )?;
        let batch_concurrency = parse_var(
            "BATCH_CONCURRENCY",
            value("BATCH_CONCURRENCY"),
            DEFAULT_BATCH_CONCURRENCY,
        )?;

        if fetch_timeout_ms == 0 {
            return Err(IndexingError::config("FETCH_TIMEOUT_MS must be greater than zero"));
        }
        if sink_timeout_ms == 0 {
            return Err(IndexingError::config("SINK_TIMEOUT_MS must be greater than zero"));
        }
        if fetch_concurrency == 0 {
            return Err(IndexingError::config("FETCH_CONCURRENCY must be greater than zero"));
        }
        if batch_concurrency == 0 {
            return Err(IndexingError::config("BATCH_CONCURRENCY must be greater than zero"));
        }

        Ok(Self {
            opensearch_url: value("OPENSEARCH_URL")
                .unwrap_or_else(|| DEFAULT_OPENSEARCH_URL.to_string()),
            index_name: value("INDEX_NAME").unwrap_or_else(|| DEFAULT_INDEX_NAME.to_string()),
            frame_path: value("FRAME_PATH").map(PathBuf::from),
            fetch_timeout: Duration::from_millis(fetch_timeout_ms),
            sink_timeout: Duration::from_millis(sink_timeout_ms),
            fetch_concurrency,
            batch_concurrency,
            json_logs: value("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),
        })
    }
}

fn parse_var<T: FromStr>(name: &str, raw: Option<String>, default: T) -> Result<T, IndexingError>
where
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| IndexingError::config(format!("Invalid {} '{}': {}", name, raw, e))),
    }
}
