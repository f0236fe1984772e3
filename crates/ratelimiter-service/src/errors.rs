//! Errors surfaced by the rate-limit service.
//!
//! Storage/audit failures never reach the caller as an `Err` — the service
//! resolves them internally via the configured fail-open/closed policy and
//! still returns a `CheckResult`. The only error that
//! actually propagates out of [`crate::service::RateLimitService::check`] is
//! a validation failure, which must never reach storage at all.

use ratelimiter_core::domain::errors::DomainError;
use thiserror::Error;

/// Errors `RateLimitService::check` can return.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ServiceError {
    /// Malformed input: empty `client_id`/`resource`, a key containing the
    /// `:` separator, or a non-finite/negative `cost`.
    #[error(transparent)]
    Validation(#[from] DomainError),
}
