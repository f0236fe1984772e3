//! Metrics adapter implementing `ratelimiter_core::ports::MetricsPort`.

pub mod prometheus_metrics;

pub use prometheus_metrics::PrometheusMetrics;
pub use ratelimiter_core::ports::metrics::{CheckStatus, MetricsPort};
