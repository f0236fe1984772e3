//! Asynchronous audit fan-out.
//!
//! The request path never awaits the audit broker.
//! `AuditFanout` owns `worker_count` independent bounded queues (shards),
//! each drained by its own background task. A decision's `client_id` is
//! hashed to pick its shard, so all events for one client land on the same
//! queue and are drained in order — preserving per-client ordering without
//! funneling every client through a single bottleneck queue, the same
//! sharding idea the reference rate limiter applies per-endpoint.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tokio::task::JoinHandle;

use ratelimiter_audit::bounded::{drop_oldest_channel, DropOldestSender};
use ratelimiter_audit::AuditLogger;
use ratelimiter_core::domain::audit_event::AuditEvent;
use ratelimiter_core::ports::metrics::MetricsPort;

/// Sharded, bounded, drop-oldest outbound queue for audit events.
pub struct AuditFanout {
    shards: Vec<DropOldestSender<AuditEvent>>,
    metrics: Arc<dyn MetricsPort>,
}

impl AuditFanout {
    /// Spawns `worker_count` background tasks (each with its own
    /// `queue_capacity`-sized queue) draining into `logger`. Returns the
    /// fan-out handle plus the spawned tasks' join handles, which the daemon
    /// can await during graceful shutdown after dropping every sender.
    pub fn spawn(
        logger: Arc<AuditLogger>,
        metrics: Arc<dyn MetricsPort>,
        worker_count: usize,
        queue_capacity: usize,
    ) -> (Self, Vec<JoinHandle<()>>) {
        let worker_count = worker_count.max(1);
        let mut shards = Vec::with_capacity(worker_count);
        let mut handles = Vec::with_capacity(worker_count);

        for _ in 0..worker_count {
            let (tx, rx) = drop_oldest_channel(queue_capacity);
            let logger = Arc::clone(&logger);
            handles.push(tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    logger.log_decision(&event).await;
                }
            }));
            shards.push(tx);
        }

        (Self { shards, metrics }, handles)
    }

    /// Enqueues `event` onto its client's shard without blocking. If the
    /// shard was full, the oldest pending event on that shard was dropped
    /// and `audit_queue_dropped_total` is incremented.
    pub async fn enqueue(&self, event: AuditEvent) {
        let shard = Self::shard_for(&event.client_id, self.shards.len());
        let evicted = self.shards[shard].send(event).await;
        if evicted {
            self.metrics.increment_audit_dropped();
        }
    }

    fn shard_for(client_id: &str, shard_count: usize) -> usize {
        let mut hasher = DefaultHasher::new();
        client_id.hash(&mut hasher);
        (hasher.finish() as usize) % shard_count.max(1)
    }
}
