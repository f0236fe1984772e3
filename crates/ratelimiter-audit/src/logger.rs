//! `AuditLogger` - the non-fatal wrapper around an [`AuditPort`].
//!
//! Mirrors the reference `AuditLogger`'s `save()` wrapper: publication
//! failures are logged with `tracing::warn!` but never propagated, since an
//! audit failure must never affect a decision that has already been returned.

use std::sync::Arc;

use ratelimiter_core::domain::audit_event::AuditEvent;
use ratelimiter_core::ports::audit::AuditPort;

/// Wraps an `Arc<dyn AuditPort>` and exposes a single infallible entry point.
pub struct AuditLogger {
    port: Arc<dyn AuditPort>,
    topic: String,
}

impl AuditLogger {
    pub fn new(port: Arc<dyn AuditPort>, topic: impl Into<String>) -> Self {
        Self {
            port,
            topic: topic.into(),
        }
    }

    /// Publishes `event`, swallowing and logging any failure.
    pub async fn log_decision(&self, event: &AuditEvent) {
        if let Err(e) = self.port.publish(&self.topic, event).await {
            tracing::warn!(
                event_id = %event.event_id,
                client_id = %event.client_id,
                error = %e,
                "failed to publish audit event"
            );
        }
    }
}
