//! External reference fetcher.
//!
//! Fetches the linked-data representation of an externally referenced
//! document. Fetching is best-effort: every failure is reported as a
//! `FetchError` and it is up to the caller to decide what to drop.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Media type requested from reference endpoints.
pub const LINKED_DATA_MEDIA_TYPE: &str = "application/ld+json";

/// Reasons a reference could not be fetched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The request could not be sent or the connection failed.
    #[error("Request error: {0}")]
    Request(String),

    /// The endpoint answered with a non-2xx status.
    #[error("Unexpected status: {0}")]
    Status(u16),

    /// The request did not complete in time.
    #[error("Request timed out")]
    Timeout,

    /// The response body is not valid JSON.
    #[error("Decode error: {0}")]
    Decode(String),
}

/// Fetches a single externally referenced document.
#[async_trait]
pub trait ReferenceFetcher: Send + Sync {
    /// Fetch the document at `uri`.
    async fn fetch(&self, uri: &Url) -> Result<Value, FetchError>;
}

/// HTTP implementation of [`ReferenceFetcher`].
pub struct HttpReferenceFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpReferenceFetcher {
    /// Create a fetcher whose requests time out after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Request(e.to_string()))?;

        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl ReferenceFetcher for HttpReferenceFetcher {
    async fn fetch(&self, uri: &Url) -> Result<Value, FetchError> {
        let request = self
            .client
            .get(uri.clone())
            .header(ACCEPT, LINKED_DATA_MEDIA_TYPE)
            .send();

        let response = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let body = response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Decode(e.to_string())
            }
        })?;

        debug!(uri = %uri, "Fetched reference");
        Ok(body)
    }
}

fn from_reqwest(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Request(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn server_with(route: &str, response: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(route))
            .and(header("accept", LINKED_DATA_MEDIA_TYPE))
            .respond_with(response)
            .expect(1)
            .mount(&server)
            .await;
        server
    }

    fn uri(server: &MockServer, route: &str) -> Url {
        Url::parse(&format!("{}{}", server.uri(), route)).unwrap()
    }

    #[test]
    fn test_new_fetcher() {
        assert!(HttpReferenceFetcher::new(Duration::from_secs(5)).is_ok());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_a_fetch_error() {
        let fetcher = HttpReferenceFetcher::new(Duration::from_millis(500)).unwrap();
        let uri = Url::parse("http://127.0.0.1:9/journal/1").unwrap();

        let result = fetcher.fetch(&uri).await;
        assert!(matches!(
            result,
            Err(FetchError::Request(_)) | Err(FetchError::Timeout)
        ));
    }

    #[tokio::test]
    async fn test_fetch_requests_linked_data_and_decodes_body() {
        let document = json!({"id": "https://api.example.org/journal/1", "name": "J"});
        let server = server_with(
            "/journal/1",
            ResponseTemplate::new(200).set_body_json(document.clone()),
        )
        .await;
        let fetcher = HttpReferenceFetcher::new(Duration::from_secs(5)).unwrap();

        let result = fetcher.fetch(&uri(&server, "/journal/1")).await;

        assert_eq!(result, Ok(document));
    }

    #[tokio::test]
    async fn test_non_success_status_is_reported() {
        let server = server_with("/journal/1", ResponseTemplate::new(404)).await;
        let fetcher = HttpReferenceFetcher::new(Duration::from_secs(5)).unwrap();

        let result = fetcher.fetch(&uri(&server, "/journal/1")).await;

        assert_eq!(result, Err(FetchError::Status(404)));
    }

    #[tokio::test]
    async fn test_invalid_body_is_a_decode_error() {
        let server = server_with(
            "/journal/1",
            ResponseTemplate::new(200).set_body_string("<html>not json</html>"),
        )
        .await;
        let fetcher = HttpReferenceFetcher::new(Duration::from_secs(5)).unwrap();

        let result = fetcher.fetch(&uri(&server, "/journal/1")).await;

        assert!(matches!(result, Err(FetchError::Decode(_))), "{:?}", result);
    }

    #[tokio::test]
    async fn test_slow_endpoint_times_out() {
        let server = server_with(
            "/journal/1",
            ResponseTemplate::new(200)
                .set_body_json(json!({"name": "J"}))
                .set_delay(Duration::from_secs(5)),
        )
        .await;
        let fetcher = HttpReferenceFetcher::new(Duration::from_millis(200)).unwrap();

        let result = fetcher.fetch(&uri(&server, "/journal/1")).await;

        assert_eq!(result, Err(FetchError::Timeout));
    }
}
