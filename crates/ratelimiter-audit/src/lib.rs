//! Audit adapters implementing `ratelimiter_core::ports::AuditPort`.
//!
//! - [`HttpSinkAuditPort`] — publishes `AuditEvent` as JSON via `reqwest` POST.
//! - [`InMemoryAuditPort`] — collects events in-process, for tests.
//! - [`AuditLogger`] — the non-fatal wrapper the service calls from its
//!   background fan-out workers; never returns an error to its caller.
//! - [`bounded::DropOldestSender`] — the bounded outbound queue the service
//!   enqueues onto from the request path, dropping the oldest pending event
//!   under sustained back-pressure instead of blocking.

pub mod bounded;
pub mod http_sink;
pub mod in_memory;
pub mod logger;

pub use bounded::{drop_oldest_channel, DropOldestReceiver, DropOldestSender};
pub use http_sink::HttpSinkAuditPort;
pub use in_memory::InMemoryAuditPort;
pub use logger::AuditLogger;
pub use ratelimiter_core::ports::audit::{AuditError, AuditPort};
