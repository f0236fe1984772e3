//! Rate-limit service (C5): orchestrates the decision core, storage, audit,
//! and metrics ports per request and owns the distributed CAS protocol.

pub mod errors;
pub mod fanout;
pub mod service;

pub use errors::ServiceError;
pub use fanout::AuditFanout;
pub use service::RateLimitService;
