//! Storage adapters implementing `ratelimiter_core::ports::StoragePort`.
//!
//! - [`RedisStoragePort`] — Redis-backed, compare-and-set enforced by a
//!   server-side Lua script.
//! - [`InMemoryStoragePort`] — `DashMap`-backed, for tests and the
//!   distributed-serializability property test; implements an honest
//!   compare-then-swap under per-key locking.

pub mod in_memory;
pub mod redis_adapter;

pub use in_memory::InMemoryStoragePort;
pub use ratelimiter_core::ports::storage::{StorageError, StoragePort, StoredBucket};
pub use redis_adapter::RedisStoragePort;
