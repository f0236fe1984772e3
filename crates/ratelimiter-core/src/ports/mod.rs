//! Port definitions (hexagonal architecture interfaces).
//!
//! These traits form the boundaries of the hexagonal architecture: the
//! domain and service layers depend only on these interfaces, while adapter
//! crates (`ratelimiter-storage`, `ratelimiter-audit`, `ratelimiter-metrics`)
//! provide concrete implementations.
//!
//! - [`StoragePort`] — durable, TTL'd, compare-and-set bucket state.
//! - [`AuditPort`] — publication of decision events to a durable bus.
//! - [`MetricsPort`] — labeled, non-blocking decision counters.

pub mod audit;
pub mod metrics;
pub mod storage;

pub use audit::AuditPort;
pub use metrics::{CheckStatus, MetricsPort};
pub use storage::{StoredBucket, StoragePort};
