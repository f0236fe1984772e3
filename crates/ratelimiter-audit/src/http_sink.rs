//! HTTP-sink audit adapter.
//!
//! Stands in for a Kafka-like bus behind the `AuditPort` contract — only that
//! contract is load-bearing, so a plain `reqwest` POST to a configured
//! endpoint is a valid adapter as long as it preserves the
//! `topic`/`client_id`-keying and at-least-once
//! guarantees the trait promises. `reqwest::Client` is `Clone + Send + Sync`
//! and cheap to clone, matching how `GraphClient` holds its client in the
//! reference workspace.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use ratelimiter_core::domain::audit_event::AuditEvent;
use ratelimiter_core::ports::audit::{AuditError, AuditPort};

/// Publishes audit events as JSON via HTTP POST to a configured sink URL.
pub struct HttpSinkAuditPort {
    client: Client,
    sink_url: String,
}

impl HttpSinkAuditPort {
    pub fn new(sink_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            sink_url: sink_url.into(),
        }
    }
}

#[async_trait]
impl AuditPort for HttpSinkAuditPort {
    async fn publish(&self, topic: &str, event: &AuditEvent) -> Result<(), AuditError> {
        let response = self
            .client
            .post(&self.sink_url)
            .header("X-Audit-Topic", topic)
            .header("X-Audit-Key", &event.client_id)
            .json(event)
            .send()
            .await
            .map_err(|e| AuditError::Transient(format!("audit sink request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AuditError::Transient(format!(
                "audit sink returned status {}",
                response.status()
            )));
        }

        debug!(topic, event_id = %event.event_id, "published audit event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[tokio::test]
    async fn publish_posts_json_and_succeeds_on_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/"))
            .and(header("X-Audit-Topic", "rate-limit.audit"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let port = HttpSinkAuditPort::new(server.uri());
        let event = AuditEvent::new(0, "client-a", "upload", true, 5);
        port.publish("rate-limit.audit", &event).await.unwrap();
    }

    #[tokio::test]
    async fn publish_returns_transient_on_non_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let port = HttpSinkAuditPort::new(server.uri());
        let event = AuditEvent::new(0, "client-a", "upload", false, 0);
        let result = port.publish("rate-limit.audit", &event).await;
        assert!(matches!(result, Err(AuditError::Transient(_))));
    }

    #[tokio::test]
    async fn publish_returns_transient_when_sink_unreachable() {
        let port = HttpSinkAuditPort::new("http://127.0.0.1:1");
        let event = AuditEvent::new(0, "client-a", "upload", true, 5);
        let result = port.publish("rate-limit.audit", &event).await;
        assert!(matches!(result, Err(AuditError::Transient(_))));
    }
}
