//! Token-bucket decision core
//!
//! [`decide`] is the pure transition function at the heart of the rate
//! limiter: given a bucket's static configuration, its last observed state,
//! a requested cost, and the current time, it computes both the decision and
//! the next state to persist. It performs no I/O and cannot fail except via
//! debug assertions on malformed static configuration, which `BucketConfig::new`
//! rejects eagerly so `decide` itself never has to.
//!
//! ## Architecture
//!
//! Earlier rate limiters in this codebase held refill state behind an
//! internal `Mutex` and refilled in-place. A distributed limiter cannot do
//! that: the bucket lives in shared storage and multiple replicas race to
//! update it. Pulling the math out into a pure function lets the service
//! layer own the concurrency (via compare-and-set) while this module owns
//! only the arithmetic.

use serde::{Deserialize, Serialize};

use crate::domain::check::CheckResult;

/// Static configuration for a bucket, resolved once per resource class.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketConfig {
    /// Maximum number of tokens the bucket can hold.
    pub capacity: f64,
    /// Tokens added per second.
    pub refill_rate: f64,
}

impl BucketConfig {
    /// Creates a new `BucketConfig`.
    ///
    /// # Panics
    ///
    /// Panics (via debug assertion) if `capacity` or `refill_rate` is not a
    /// positive, finite number. Configuration is static and validated once at
    /// startup, so `decide` never has to handle malformed config at request time.
    pub fn new(capacity: f64, refill_rate: f64) -> Self {
        debug_assert!(
            capacity.is_finite() && capacity >= 1.0,
            "capacity must be finite and >= 1.0, got {capacity}"
        );
        debug_assert!(
            refill_rate.is_finite() && refill_rate > 0.0,
            "refill_rate must be finite and positive, got {refill_rate}"
        );
        Self {
            capacity,
            refill_rate,
        }
    }
}

/// The durable state of a single bucket: current token count and the instant
/// it was last refilled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketState {
    /// Current number of available tokens (fractional, for smooth refill).
    pub tokens: f64,
    /// Unix epoch milliseconds of the last refill calculation.
    pub last_refill: i64,
}

impl BucketState {
    /// A freshly created bucket, full at `now_millis`.
    pub fn full(cfg: &BucketConfig, now_millis: i64) -> Self {
        Self {
            tokens: cfg.capacity,
            last_refill: now_millis,
        }
    }
}

/// Computes the decision for a single `(cost)` request against a bucket, and
/// the next state that must be persisted regardless of whether the request
/// was allowed.
///
/// Clock regressions (`now_millis < prior.last_refill`) clamp elapsed time to
/// zero rather than refilling backwards; the stored `last_refill` is left
/// unchanged in that case so it never moves backward across writes.
pub fn decide(
    cfg: &BucketConfig,
    prior: &BucketState,
    cost: f64,
    now_millis: i64,
) -> (CheckResult, BucketState) {
    let elapsed_sec = if now_millis >= prior.last_refill {
        (now_millis - prior.last_refill) as f64 / 1000.0
    } else {
        0.0
    };
    let refilled = (prior.tokens + elapsed_sec * cfg.refill_rate).min(cfg.capacity);
    let next_last_refill = if now_millis >= prior.last_refill {
        now_millis
    } else {
        prior.last_refill
    };

    if cost > cfg.capacity {
        let next = BucketState {
            tokens: refilled,
            last_refill: next_last_refill,
        };
        let retry_after = (cost / cfg.refill_rate).ceil() as u32;
        let result = CheckResult {
            allowed: false,
            remaining: 0,
            limit: cfg.capacity.floor() as u32,
            reset_at: reset_at(cfg, &next, now_millis),
            retry_after,
        };
        return (result, next);
    }

    if refilled >= cost {
        let next = BucketState {
            tokens: refilled - cost,
            last_refill: next_last_refill,
        };
        let result = CheckResult {
            allowed: true,
            remaining: next.tokens.floor() as u32,
            limit: cfg.capacity.floor() as u32,
            reset_at: reset_at(cfg, &next, now_millis),
            retry_after: 0,
        };
        (result, next)
    } else {
        let next = BucketState {
            tokens: refilled,
            last_refill: next_last_refill,
        };
        let deficit = cost - refilled;
        let retry_after = (deficit / cfg.refill_rate).ceil() as u32;
        let result = CheckResult {
            allowed: false,
            remaining: 0,
            limit: cfg.capacity.floor() as u32,
            reset_at: reset_at(cfg, &next, now_millis),
            retry_after,
        };
        (result, next)
    }
}

/// Unix seconds at which the bucket is expected to return to full capacity.
fn reset_at(cfg: &BucketConfig, state: &BucketState, now_millis: i64) -> i64 {
    if state.tokens >= cfg.capacity {
        return now_millis / 1000;
    }
    let seconds_to_full = (cfg.capacity - state.tokens) / cfg.refill_rate;
    ((now_millis as f64 / 1000.0) + seconds_to_full).floor() as i64
}
