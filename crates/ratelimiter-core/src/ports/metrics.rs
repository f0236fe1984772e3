//! Metrics port: labeled, non-blocking decision counters.

/// The outcome label recorded against `rate_limit_checks_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Allowed,
    Blocked,
    /// The decision could not be made before the deadline (or storage
    /// CAS retries were exhausted) and the configured failure policy
    /// substituted a result.
    Timeout,
}

impl CheckStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckStatus::Allowed => "allowed",
            CheckStatus::Blocked => "blocked",
            CheckStatus::Timeout => "timeout",
        }
    }
}

/// Port trait for recording rate-limit decisions.
///
/// Implementations MUST be non-blocking and constant-time; this is called
/// synchronously on the request path. Adapters MAY cap label cardinality
/// (e.g. hash `client_id` into a bounded label space) to prevent unbounded
/// label explosion — this is a mandatory concern, not an optional nicety.
pub trait MetricsPort: Send + Sync {
    fn increment_check(&self, client_id: &str, status: CheckStatus);

    /// Records an eviction from the bounded audit fan-out queue (an event
    /// dropped to make room for a newer one under sustained back-pressure).
    fn increment_audit_dropped(&self);
}
