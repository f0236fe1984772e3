//! The event published for every rate-limit decision.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An immutable record of a single decision, published to the audit bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique identifier, used by consumers to dedupe under at-least-once delivery.
    pub event_id: Uuid,
    /// Unix epoch milliseconds at which the decision was made.
    pub timestamp: i64,
    pub client_id: String,
    pub resource: String,
    pub allowed: bool,
    pub remaining: u32,
}

impl AuditEvent {
    /// Creates a new event with a fresh `event_id`.
    pub fn new(
        timestamp: i64,
        client_id: impl Into<String>,
        resource: impl Into<String>,
        allowed: bool,
        remaining: u32,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            timestamp,
            client_id: client_id.into(),
            resource: resource.into(),
            allowed,
            remaining,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_events_get_distinct_ids() {
        let a = AuditEvent::new(0, "client-a", "upload", true, 5);
        let b = AuditEvent::new(0, "client-a", "upload", true, 5);
        assert_ne!(a.event_id, b.event_id);
    }

    #[test]
    fn round_trips_through_json() {
        let event = AuditEvent::new(1_700_000_000_000, "client-a", "upload", false, 0);
        let json = serde_json::to_string(&event).unwrap();
        let decoded: AuditEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, decoded);
    }
}
