//! The outcome of a single rate-limit check, as returned across both
//! transport surfaces.

use serde::{Deserialize, Serialize};

/// Result of evaluating a `(client_id, resource, cost)` request against its bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CheckResult {
    /// Whether the request may proceed.
    pub allowed: bool,
    /// Tokens remaining after this decision (0 when denied).
    pub remaining: u32,
    /// The bucket's configured capacity, floored to an integer.
    pub limit: u32,
    /// Unix seconds at which the bucket is expected to return to full capacity.
    pub reset_at: i64,
    /// Seconds the caller should wait before retrying (0 when allowed).
    pub retry_after: u32,
}

impl CheckResult {
    /// The wire-compat "deny and zero" response used when validation fails
    /// before a bucket can be resolved, or when the service times out and the
    /// configured policy is fail-closed.
    pub fn denied_zero() -> Self {
        Self {
            allowed: false,
            remaining: 0,
            limit: 0,
            reset_at: 0,
            retry_after: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denied_zero_is_all_zeroes() {
        let r = CheckResult::denied_zero();
        assert!(!r.allowed);
        assert_eq!(r.remaining, 0);
        assert_eq!(r.limit, 0);
        assert_eq!(r.reset_at, 0);
        assert_eq!(r.retry_after, 0);
    }
}
