//! `DashMap`-backed storage adapter.
//!
//! Used by tests and by the distributed-serializability property test.
//! Generalizes the `HashMap`-of-buckets-behind-a-lock
//! shape of the reference Graph API rate limiter's `AdaptiveRateLimiter` to
//! per-key locking via `DashMap::entry`, so concurrent tasks contending on
//! the same key produce genuine CAS contention rather than a single global
//! mutex serializing unrelated keys.
//!
//! No TTL tracking: entries live for the process lifetime. That is fine for
//! tests but means this adapter is not a substitute for `RedisStoragePort`
//! in production (it is never wired into the daemon).

use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use ratelimiter_core::ports::storage::{StorageError, StoragePort, StoredBucket};

/// In-memory `StoragePort` adapter with real per-key CAS semantics.
#[derive(Debug, Default)]
pub struct InMemoryStoragePort {
    buckets: DashMap<String, StoredBucket>,
}

impl InMemoryStoragePort {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StoragePort for InMemoryStoragePort {
    async fn get(&self, key: &str) -> Result<Option<StoredBucket>, StorageError> {
        Ok(self.buckets.get(key).map(|entry| *entry))
    }

    async fn compare_and_set(
        &self,
        key: &str,
        expected: Option<&StoredBucket>,
        next: &StoredBucket,
        _ttl: Duration,
    ) -> Result<bool, StorageError> {
        match self.buckets.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => match expected {
                Some(exp) if *occupied.get() == *exp => {
                    occupied.insert(*next);
                    Ok(true)
                }
                _ => Ok(false),
            },
            Entry::Vacant(vacant) => {
                if expected.is_none() {
                    vacant.insert(*next);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }
}
