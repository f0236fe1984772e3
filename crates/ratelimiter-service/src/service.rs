//! `RateLimitService` - the distributed rate-limit protocol (C5).
//!
//! Owns the single piece of cross-replica coordination this system needs:
//! the bounded compare-and-set attempt loop against shared storage. Metrics
//! and audit are both side effects of a decision that has already been made,
//! never inputs to it — metrics recording is synchronous and non-blocking,
//! audit publication is enqueued onto [`crate::fanout::AuditFanout`] and
//! never awaited on the request path.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tracing::warn;

use ratelimiter_core::config::{BucketsConfig, FailurePolicy};
use ratelimiter_core::domain::audit_event::AuditEvent;
use ratelimiter_core::domain::bucket::{decide, BucketConfig, BucketState};
use ratelimiter_core::domain::check::CheckResult;
use ratelimiter_core::domain::errors::DomainError;
use ratelimiter_core::domain::key::BucketKey;
use ratelimiter_core::ports::metrics::{CheckStatus, MetricsPort};
use ratelimiter_core::ports::storage::{StorageError, StoragePort, StoredBucket};

use crate::errors::ServiceError;
use crate::fanout::AuditFanout;

/// Bounded retries for the compare-and-set attempt loop.
const MAX_ATTEMPTS: u32 = 3;

/// Orchestrates C1 (decision core) through C4 (metrics/audit) for a single
/// `(client_id, resource, cost)` request, serializing concurrent replicas'
/// decisions on the same key via storage's compare-and-set.
pub struct RateLimitService {
    storage: Arc<dyn StoragePort>,
    metrics: Arc<dyn MetricsPort>,
    audit: Arc<AuditFanout>,
    buckets: Arc<BucketsConfig>,
    policy: FailurePolicy,
    deadline: Duration,
    warned_resources: Mutex<std::collections::HashSet<String>>,
}

impl RateLimitService {
    pub fn new(
        storage: Arc<dyn StoragePort>,
        metrics: Arc<dyn MetricsPort>,
        audit: Arc<AuditFanout>,
        buckets: Arc<BucketsConfig>,
        policy: FailurePolicy,
        deadline: Duration,
    ) -> Self {
        Self {
            storage,
            metrics,
            audit,
            buckets,
            policy,
            deadline,
            warned_resources: Mutex::new(std::collections::HashSet::new()),
        }
    }

    /// Evaluates `(client_id, resource, cost)` against its bucket and returns
    /// the decision. Never returns `Err` once validation passes — storage
    /// and deadline failures are resolved internally via the configured
    /// fail-open/closed policy and still produce a `CheckResult`.
    pub async fn check(
        &self,
        client_id: &str,
        resource: &str,
        cost: f64,
    ) -> Result<CheckResult, ServiceError> {
        if !cost.is_finite() {
            return Err(DomainError::NonFiniteCost(cost).into());
        }
        if cost < 0.0 {
            return Err(DomainError::NegativeCost(cost).into());
        }
        let key = BucketKey::new(client_id, resource)?;

        let cfg = self.resolve_config(resource);
        let now = Utc::now().timestamp_millis();

        let (result, status) = match tokio::time::timeout(
            self.deadline,
            self.attempt_loop(&key, &cfg, cost, now),
        )
        .await
        {
            Ok(Ok(result)) => {
                let status = if result.allowed {
                    CheckStatus::Allowed
                } else {
                    CheckStatus::Blocked
                };
                (result, status)
            }
            Ok(Err(err)) => {
                warn!(key = %key, error = %err, policy = ?self.policy, "storage error, applying failure policy");
                (self.apply_failure_policy(&cfg, now), CheckStatus::Timeout)
            }
            Err(_elapsed) => {
                warn!(key = %key, deadline_ms = self.deadline.as_millis() as u64, policy = ?self.policy, "decision deadline exceeded, applying failure policy");
                (self.apply_failure_policy(&cfg, now), CheckStatus::Timeout)
            }
        };

        self.metrics.increment_check(client_id, status);

        let event = AuditEvent::new(now, client_id, resource, result.allowed, result.remaining);
        self.audit.enqueue(event).await;

        Ok(result)
    }

    /// `GetQuota` semantics: a real zero-cost check, not a stubbed constant.
    pub async fn check_quota(
        &self,
        client_id: &str,
        resource: &str,
    ) -> Result<CheckResult, ServiceError> {
        self.check(client_id, resource, 0.0).await
    }

    /// Resolves the effective bucket config for `resource`, logging a single
    /// warning per unique unknown resource class (§4.5 step 2, §9 open
    /// question 1: unknown resources fall back to the default class).
    fn resolve_config(&self, resource: &str) -> BucketConfig {
        if !self.buckets.overrides.contains_key(resource) {
            let mut warned = self.warned_resources.lock().unwrap();
            if warned.insert(resource.to_string()) {
                warn!(resource, "unknown resource class, using default bucket config");
            }
        }
        self.buckets.resolve(resource)
    }

    /// The bounded compare-and-set attempt loop. Returns the first applied
    /// decision, or the last storage error once attempts are exhausted.
    async fn attempt_loop(
        &self,
        key: &BucketKey,
        cfg: &BucketConfig,
        cost: f64,
        now: i64,
    ) -> Result<CheckResult, StorageError> {
        let mut last_err: Option<StorageError> = None;

        for _ in 0..MAX_ATTEMPTS {
            let prior_stored = match self.storage.get(key.as_str()).await {
                Ok(v) => v,
                Err(StorageError::Permanent(msg)) => {
                    warn!(key = %key, error = %msg, "malformed stored bucket, treating as absent");
                    None
                }
                Err(err) => {
                    last_err = Some(err);
                    continue;
                }
            };

            let prior = prior_stored
                .map(BucketState::from)
                .unwrap_or_else(|| BucketState::full(cfg, now));
            let (result, next) = decide(cfg, &prior, cost, now);
            let next_stored: StoredBucket = next.into();

            match self
                .storage
                .compare_and_set(
                    key.as_str(),
                    prior_stored.as_ref(),
                    &next_stored,
                    Duration::from_secs(3600),
                )
                .await
            {
                Ok(true) => return Ok(result),
                Ok(false) => continue,
                Err(err) => {
                    last_err = Some(err);
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| {
            StorageError::Transient(format!(
                "compare_and_set retries exhausted after {MAX_ATTEMPTS} attempts"
            ))
        }))
    }

    /// Applies the configured fail-open/closed policy when storage could not
    /// be consulted within the deadline or after retries are exhausted.
    fn apply_failure_policy(&self, cfg: &BucketConfig, now: i64) -> CheckResult {
        let limit = cfg.capacity.floor() as u32;
        match self.policy {
            FailurePolicy::FailOpen => CheckResult {
                allowed: true,
                remaining: limit,
                limit,
                reset_at: now / 1000,
                retry_after: 0,
            },
            FailurePolicy::FailClosed => CheckResult {
                allowed: false,
                remaining: 0,
                limit,
                reset_at: now / 1000,
                retry_after: 1,
            },
        }
    }
}
