//! Composite bucket keys.

use crate::domain::errors::DomainError;

/// The storage key identifying a single bucket: `"<client_id>:<resource>"`.
///
/// Validated and composed eagerly so downstream ports never see a malformed
/// or ambiguous key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey(String);

impl BucketKey {
    /// Validates `client_id`/`resource` and composes the storage key.
    ///
    /// Rejects empty fields and fields containing the `:` separator, rather
    /// than silently escaping it, so the key remains trivially invertible.
    pub fn new(client_id: &str, resource: &str) -> Result<Self, DomainError> {
        if client_id.is_empty() {
            return Err(DomainError::EmptyClientId);
        }
        if resource.is_empty() {
            return Err(DomainError::EmptyResource);
        }
        if client_id.contains(':') {
            return Err(DomainError::KeySeparatorInField {
                field: "client_id",
                value: client_id.to_string(),
            });
        }
        if resource.contains(':') {
            return Err(DomainError::KeySeparatorInField {
                field: "resource",
                value: resource.to_string(),
            });
        }
        Ok(Self(format!("{client_id}:{resource}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BucketKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
