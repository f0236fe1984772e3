//! In-memory audit adapter, for tests.

use std::sync::Mutex;

use async_trait::async_trait;

use ratelimiter_core::domain::audit_event::AuditEvent;
use ratelimiter_core::ports::audit::{AuditError, AuditPort};

/// Collects published events into a `Mutex<Vec<AuditEvent>>`.
#[derive(Default)]
pub struct InMemoryAuditPort {
    events: Mutex<Vec<(String, AuditEvent)>>,
}

impl InMemoryAuditPort {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events published so far, in publication order.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, e)| e.clone())
            .collect()
    }

    /// Events published for a given client, in publication order — used to
    /// assert per-client ordering under at-least-once delivery.
    pub fn events_for_client(&self, client_id: &str) -> Vec<AuditEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.client_id == client_id)
            .collect()
    }
}

#[async_trait]
impl AuditPort for InMemoryAuditPort {
    async fn publish(&self, topic: &str, event: &AuditEvent) -> Result<(), AuditError> {
        self.events
            .lock()
            .unwrap()
            .push((topic.to_string(), event.clone()));
        Ok(())
    }
}
