//! Domain error types
//!
//! These errors are raised by validation in the domain layer, before any
//! storage or audit I/O is attempted.

use thiserror::Error;

/// Errors that can occur while validating a check request in the domain layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// `client_id` was empty.
    #[error("client_id must not be empty")]
    EmptyClientId,

    /// `resource` was empty.
    #[error("resource must not be empty")]
    EmptyResource,

    /// `client_id` or `resource` contained the `:` key separator.
    #[error("{field} must not contain ':': {value}")]
    KeySeparatorInField { field: &'static str, value: String },

    /// `cost` was NaN or infinite.
    #[error("cost must be finite, got {0}")]
    NonFiniteCost(f64),

    /// `cost` was negative.
    #[error("cost must not be negative, got {0}")]
    NegativeCost(f64),
}
