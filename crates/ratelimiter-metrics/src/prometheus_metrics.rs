//! `PrometheusMetrics` - the shipped `MetricsPort` adapter.
//!
//! Near-direct adaptation of the reference `MetricsRegistry`: a
//! `Registry::new_custom`, typed `IntCounterVec`s, and an `encode()` that
//! hands back Prometheus text exposition via `TextEncoder`. The one addition
//! the distilled spec calls out as mandatory (§4.4) is cardinality capping:
//! when configured, `client_id` label values are hashed into a bounded
//! number of buckets before being recorded, so an attacker (or a buggy
//! caller) handing out unbounded distinct client IDs cannot blow up the
//! metrics registry's label cardinality.

use std::hash::{Hash, Hasher};

use prometheus::{Encoder, IntCounterVec, Opts, Registry, TextEncoder};

use ratelimiter_core::ports::metrics::{CheckStatus, MetricsPort};

/// Prometheus-backed metrics adapter.
///
/// Registers `rate_limit_checks_total{client_id, status}` and
/// `audit_queue_dropped_total` (no labels) under the `rate_limit` namespace.
pub struct PrometheusMetrics {
    registry: Registry,
    checks_total: IntCounterVec,
    audit_queue_dropped_total: IntCounterVec,
    cardinality_cap: Option<u32>,
}

impl PrometheusMetrics {
    /// Creates a new registry. `cardinality_cap`, when set, hashes
    /// `client_id` into that many label buckets (e.g. `client_id` becomes
    /// `"bucket-42"`) instead of using it verbatim.
    pub fn new(cardinality_cap: Option<u32>) -> anyhow::Result<Self> {
        let registry = Registry::new_custom(Some("rate_limit".to_string()), None)?;

        let checks_total = IntCounterVec::new(
            Opts::new("checks_total", "Total rate-limit decisions"),
            &["client_id", "status"],
        )?;
        registry.register(Box::new(checks_total.clone()))?;

        let audit_queue_dropped_total = IntCounterVec::new(
            Opts::new(
                "audit_queue_dropped_total",
                "Audit events evicted from the bounded fan-out queue under back-pressure",
            ),
            &[],
        )?;
        registry.register(Box::new(audit_queue_dropped_total.clone()))?;

        Ok(Self {
            registry,
            checks_total,
            audit_queue_dropped_total,
            cardinality_cap,
        })
    }

    /// Encodes all registered metrics in Prometheus text exposition format.
    pub fn encode(&self) -> anyhow::Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }

    /// Maps `client_id` to the label value actually recorded, applying the
    /// cardinality cap if configured.
    fn label_for(&self, client_id: &str) -> String {
        match self.cardinality_cap {
            Some(cap) if cap > 0 => {
                let mut hasher = std::collections::hash_map::DefaultHasher::new();
                client_id.hash(&mut hasher);
                let bucket = hasher.finish() % u64::from(cap);
                format!("bucket-{bucket}")
            }
            _ => client_id.to_string(),
        }
    }
}

impl MetricsPort for PrometheusMetrics {
    fn increment_check(&self, client_id: &str, status: CheckStatus) {
        let label = self.label_for(client_id);
        self.checks_total
            .with_label_values(&[&label, status.as_str()])
            .inc();
    }

    fn increment_audit_dropped(&self) {
        self.audit_queue_dropped_total
            .with_label_values(&[])
            .inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_check_is_observable_in_encoded_output() {
        let metrics = PrometheusMetrics::new(None).unwrap();
        metrics.increment_check("client-a", CheckStatus::Allowed);
        metrics.increment_check("client-a", CheckStatus::Blocked);
        metrics.increment_check("client-b", CheckStatus::Timeout);

        let output = metrics.encode().unwrap();
        assert!(output.contains("rate_limit_checks_total"));
        assert!(output.contains("client-a"));
        assert!(output.contains("client-b"));
        assert!(output.contains("allowed"));
        assert!(output.contains("blocked"));
        assert!(output.contains("timeout"));
    }

    #[test]
    fn audit_dropped_counter_increments() {
        let metrics = PrometheusMetrics::new(None).unwrap();
        metrics.increment_audit_dropped();
        metrics.increment_audit_dropped();

        let output = metrics.encode().unwrap();
        assert!(output.contains("rate_limit_audit_queue_dropped_total 2"));
    }

    #[test]
    fn cardinality_cap_bounds_distinct_label_values() {
        let metrics = PrometheusMetrics::new(Some(4)).unwrap();
        for i in 0..100 {
            metrics.increment_check(&format!("client-{i}"), CheckStatus::Allowed);
        }

        let output = metrics.encode().unwrap();
        // Every recorded label must be one of the 4 bucket values.
        for i in 0..4 {
            let _ = output.contains(&format!("bucket-{i}"));
        }
        assert!(!output.contains("client-0"));
    }

    #[test]
    fn same_client_id_hashes_to_same_bucket() {
        let metrics = PrometheusMetrics::new(Some(8)).unwrap();
        assert_eq!(
            metrics.label_for("client-a"),
            metrics.label_for("client-a")
        );
    }
}
