//! A transport that POSTs batches as JSON to the collector.

use super::TransportError;
use crate::core::{Ack, CancelToken, MetricBatch, Transport};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use std::time::Duration;
use tracing::{debug, instrument};

pub struct HttpTransport {
    client: Client,
    url: Url,
}

impl HttpTransport {
    /// Creates a new `HttpTransport`.
    ///
    /// # Arguments
    /// * `url` - The collector endpoint batches are posted to
    /// * `timeout` - Per-request timeout, covering connect and response
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let url = Url::parse(url).with_context(|| format!("invalid collector url '{}'", url))?;
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { client, url })
    }
}

/// Resolves once shutdown has been signalled. Never resolves if the sender is
/// gone without signalling.
async fn cancelled(mut cancel: CancelToken) {
    let signalled = cancel.wait_for(|stop| *stop).await.is_ok();
    if !signalled {
        std::future::pending::<()>().await;
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, cancel, batch), fields(entries = batch.len()))]
    async fn send(&self, cancel: CancelToken, batch: &MetricBatch) -> Result<Ack, TransportError> {
        let request = self.client.post(self.url.clone()).json(batch).send();

        let response = tokio::select! {
            biased;
            _ = cancelled(cancel) => return Err(TransportError::Cancelled),
            response = request => response?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(status = %status, "Collector accepted batch");
        Ok(Ack {
            entries: batch.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Label, MetricCategory, MetricRecord, NODE_SOURCE_PATH};
    use chrono::Utc;
    use tokio::sync::watch;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn batch() -> MetricBatch {
        let mut batch = MetricBatch::new();
        batch.append(
            vec![MetricRecord::gauge("node_cpu_load_avg_1", &Label::host("h1"), 0.5)],
            MetricCategory::Node,
            NODE_SOURCE_PATH,
            "h1",
            0,
            Utc::now(),
        );
        batch
    }

    #[tokio::test]
    async fn test_http_transport_posts_batch() {
        // Arrange
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/metrics"))
            .and(body_partial_json(serde_json::json!({
                "metrics": [{ "metricName": "node_cpu_load_avg_1", "nodeId": "h1", "kind": "gauge" }]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        let transport = HttpTransport::new(&format!("{}/api/v1/metrics", server.uri()), Duration::from_secs(5)).unwrap();
        let (_tx, rx) = watch::channel(false);

        // Act
        let ack = transport.send(rx, &batch()).await.unwrap();

        // Assert
        assert_eq!(ack.entries, 1);
    }

    #[tokio::test]
    async fn test_http_transport_reports_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;
        let transport = HttpTransport::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let (_tx, rx) = watch::channel(false);

        let err = transport.send(rx, &batch()).await.unwrap_err();

        match err {
            TransportError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "overloaded");
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[tokio::test]
    async fn test_http_transport_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;
        let transport = HttpTransport::new(&server.uri(), Duration::from_millis(200)).unwrap();
        let (_tx, rx) = watch::channel(false);

        let err = transport.send(rx, &batch()).await.unwrap_err();

        assert!(matches!(err, TransportError::Http(ref e) if e.is_timeout()), "got {}", err);
    }

    #[tokio::test]
    async fn test_http_transport_aborts_on_shutdown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;
        let transport = HttpTransport::new(&server.uri(), Duration::from_secs(30)).unwrap();
        let (tx, rx) = watch::channel(false);

        let batch = batch();
        let send = transport.send(rx, &batch);
        tx.send(true).unwrap();

        assert!(matches!(send.await, Err(TransportError::Cancelled)));
    }

    #[test]
    fn test_http_transport_rejects_invalid_url() {
        assert!(HttpTransport::new("not a url", Duration::from_secs(1)).is_err());
    }
}
