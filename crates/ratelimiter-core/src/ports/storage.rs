//! Storage port: durable, TTL'd, compare-and-set bucket state.
//!
//! ## Design Notes
//!
//! - The naive "read, mutate, write" pattern is racy across replicas: two
//!   concurrent deciders can read the same prior state, both compute a
//!   valid decrement, and the last writer silently overwrites the first.
//!   `compare_and_set` is the mandated fix — it succeeds only if the stored
//!   value still equals what the caller last observed.
//! - `anyhow` is deliberately not used here; storage failures are
//!   classified (`Transient` vs `Permanent`) because the service layer's
//!   fail-open/closed policy needs to tell them apart.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The wire-level representation of a bucket's durable state.
///
/// Mirrors [`crate::domain::bucket::BucketState`] but lives at the port
/// boundary so adapters can (de)serialize it without depending on the
/// domain module's internal representation changing shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StoredBucket {
    pub tokens: f64,
    pub last_refill: i64,
}

impl From<crate::domain::bucket::BucketState> for StoredBucket {
    fn from(state: crate::domain::bucket::BucketState) -> Self {
        Self {
            tokens: state.tokens,
            last_refill: state.last_refill,
        }
    }
}

impl From<StoredBucket> for crate::domain::bucket::BucketState {
    fn from(stored: StoredBucket) -> Self {
        Self {
            tokens: stored.tokens,
            last_refill: stored.last_refill,
        }
    }
}

/// Errors a storage adapter can raise.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Network/timeout/connection-loss error. The caller should apply its
    /// fail-open/closed policy.
    #[error("storage transient error: {0}")]
    Transient(String),
    /// The stored value could not be decoded. The service treats the key
    /// as absent; the next successful write repairs the record.
    #[error("storage permanent error: {0}")]
    Permanent(String),
}

/// Port trait for durable bucket storage.
///
/// Implementations MUST provide real compare-and-set semantics (either a
/// native atomic script, as `RedisStoragePort` does, or an honest
/// compare-then-swap under per-key locking, as `InMemoryStoragePort` does).
/// A port that merely performs read-then-write is not a valid adapter for
/// this trait.
#[async_trait]
pub trait StoragePort: Send + Sync {
    /// Returns the last durably stored state for `key`, or `None` if there
    /// is none (never written, or TTL-expired).
    async fn get(&self, key: &str) -> Result<Option<StoredBucket>, StorageError>;

    /// Conditionally writes `next` under `key`, succeeding only if the
    /// currently stored value equals `expected` (`None` meaning "key must
    /// still be absent"). On success, `ttl` is (re)applied. Returns whether
    /// the write was applied.
    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&StoredBucket>,
        next: &StoredBucket,
        ttl: Duration,
    ) -> Result<bool, StorageError>;
}
