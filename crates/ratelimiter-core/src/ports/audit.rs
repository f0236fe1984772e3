//! Audit port: publication of decision events to a durable bus.
//!
//! ## Design Notes
//!
//! - `anyhow::Result` is not used here either: the service needs to tell
//!   `Transient` (retry-worthy) from `Permanent` (drop and log) failures
//!   apart, even though neither ever affects the decision already returned.
//! - Guarantee is at-least-once; consumers dedupe by `AuditEvent::event_id`.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::audit_event::AuditEvent;

/// Errors an audit adapter can raise. Never propagated to the decision path.
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit sink transient error: {0}")]
    Transient(String),
    #[error("audit sink permanent error: {0}")]
    Permanent(String),
}

/// Port trait for publishing audit events to a durable bus.
///
/// `topic` and ordering-by-`client_id` are the caller's responsibility to
/// pass through correctly; the adapter just publishes.
#[async_trait]
pub trait AuditPort: Send + Sync {
    async fn publish(&self, topic: &str, event: &AuditEvent) -> Result<(), AuditError>;
}
