//! Record delivery: filter gate, envelope construction, resilient send.
//!
//! The module is organized into four submodules:
//!
//! - [`filter`] - Plain-text length gate evaluated before any network call
//! - [`auth`] - Credential collaborator (bearer token attach + refresh)
//! - [`backoff`] - Exponential backoff policy and per-delivery state
//! - [`transport`] - Retrying POST transport wrapping the above
//!
//! [`Publisher`] ties them together: a record either passes the filter and
//! is handed to the transport, or is skipped without touching the network.
//! Delivery is at-least-once; a final failure is logged and dropped, the
//! next cycle supersedes it.

pub mod auth;
pub mod backoff;
pub mod filter;
pub mod transport;

pub use auth::{BearerToken, CredentialProvider, NoAuth, TOKEN_ENV};
pub use backoff::BackoffPolicy;
pub use filter::{FilterDecision, MessageFilter};
pub use transport::{ResilientTransport, TransportError};

use crate::feed::Record;
use base64::Engine as _;

/// How one record's publish attempt resolved. Every record gets exactly
/// one outcome per cycle.
#[derive(Debug)]
pub enum DeliveryOutcome {
    /// The endpoint acknowledged the message with a 2xx.
    Delivered,
    /// Plain-text length was below the threshold; no network call made.
    Skipped { plain_len: usize },
    /// The transport gave up (budget exhausted, cancelled, or hard error).
    Failed { reason: String },
}

/// Publishes records to a single topic on the configured endpoint.
pub struct Publisher {
    transport: ResilientTransport,
    filter: MessageFilter,
    separator: String,
    publish_url: String,
}

impl Publisher {
    pub fn new(
        transport: ResilientTransport,
        filter: MessageFilter,
        separator: String,
        endpoint: &str,
        topic: &str,
    ) -> Self {
        Self {
            transport,
            filter,
            separator,
            publish_url: publish_url(endpoint, topic),
        }
    }

    /// Filters and, on pass, delivers one record. Never panics, never
    /// retries beyond the transport's policy, never re-queues.
    pub async fn publish(&self, record: &Record) -> DeliveryOutcome {
        let payload = format!("{}{}{}", record.title, self.separator, record.content);

        let plain = match self.filter.decide(&payload) {
            FilterDecision::Skip { plain_len } => {
                tracing::debug!(
                    record = %record.id,
                    plain_len = plain_len,
                    threshold = self.filter.min_plain_chars(),
                    "Record below length threshold, skipping"
                );
                return DeliveryOutcome::Skipped { plain_len };
            }
            FilterDecision::Publish { plain } => plain,
        };

        // Envelope carries the raw payload; the filter only gates, it
        // never rewrites what subscribers receive.
        let body = envelope(&payload);

        match self.transport.send(&self.publish_url, &body).await {
            Ok(()) => {
                let preview: String = plain.chars().take(self.filter.min_plain_chars()).collect();
                tracing::info!(
                    record = %record.id,
                    payload_bytes = payload.len(),
                    preview = %preview,
                    "Delivered record"
                );
                DeliveryOutcome::Delivered
            }
            Err(e) => {
                tracing::warn!(record = %record.id, error = %e, "Delivery failed, dropping record");
                DeliveryOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }
}

/// Pub/Sub-style publish body: `{"messages":[{"data":"<base64(payload)>"}]}`.
fn envelope(payload: &str) -> serde_json::Value {
    let data = base64::engine::general_purpose::STANDARD.encode(payload.as_bytes());
    serde_json::json!({ "messages": [{ "data": data }] })
}

fn publish_url(endpoint: &str, topic: &str) -> String {
    format!("{}/topics/{}:publish", endpoint.trim_end_matches('/'), topic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publish::auth::NoAuth;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn publisher(endpoint: &str, min_plain_chars: usize) -> Publisher {
        let (_tx, rx) = watch::channel(false);
        let transport = ResilientTransport::new(
            reqwest::Client::new(),
            Arc::new(NoAuth),
            BackoffPolicy {
                max_elapsed_ms: 0,
                ..BackoffPolicy::default()
            },
            Duration::from_secs(5),
            rx,
        );
        Publisher::new(
            transport,
            MessageFilter::new(min_plain_chars),
            "###CONTENT: ".to_string(),
            endpoint,
            "news",
        )
    }

    fn record(title: &str, content: &str) -> Record {
        Record {
            id: "r1".to_string(),
            title: title.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_publish_url_shape() {
        assert_eq!(
            publish_url("https://pubsub.example.com/v1", "news"),
            "https://pubsub.example.com/v1/topics/news:publish"
        );
        assert_eq!(
            publish_url("https://pubsub.example.com/v1/", "news"),
            "https://pubsub.example.com/v1/topics/news:publish"
        );
    }

    #[test]
    fn test_envelope_payload_decodes() {
        let body = envelope("Title###CONTENT: body");
        let data = body["messages"][0]["data"].as_str().unwrap();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(data)
            .unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), "Title###CONTENT: body");
    }

    #[tokio::test]
    async fn test_passing_record_is_delivered() {
        let long_body = "x".repeat(500);
        let expected_data = base64::engine::general_purpose::STANDARD
            .encode(format!("Big story###CONTENT: {}", long_body).as_bytes());

        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/topics/news:publish"))
            .and(body_partial_json(
                serde_json::json!({"messages": [{"data": expected_data}]}),
            ))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let publisher = publisher(&mock_server.uri(), 400);
        let outcome = publisher.publish(&record("Big story", &long_body)).await;
        assert!(matches!(outcome, DeliveryOutcome::Delivered));
    }

    #[tokio::test]
    async fn test_short_record_skipped_without_network() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let publisher = publisher(&mock_server.uri(), 400);
        let outcome = publisher.publish(&record("Tiny", "too short")).await;
        assert!(matches!(outcome, DeliveryOutcome::Skipped { .. }));
    }

    #[tokio::test]
    async fn test_markup_stripped_before_threshold_check() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        // Hundreds of bytes of markup around a handful of text characters
        let markup_heavy = format!("<div class=\"wrapper\">{}</div>", "<p>hi</p>".repeat(40));
        let publisher = publisher(&mock_server.uri(), 400);
        let outcome = publisher.publish(&record("T", &markup_heavy)).await;

        match outcome {
            DeliveryOutcome::Skipped { plain_len } => assert!(plain_len < 400),
            other => panic!("expected Skipped, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_transport_failure_maps_to_failed() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&mock_server)
            .await;

        let long_body = "x".repeat(500);
        let publisher = publisher(&mock_server.uri(), 400);
        let outcome = publisher.publish(&record("Story", &long_body)).await;

        match outcome {
            DeliveryOutcome::Failed { reason } => assert!(reason.contains("500")),
            other => panic!("expected Failed, got {:?}", other),
        }
    }
}
