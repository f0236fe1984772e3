//! Rate limiter core - domain logic, ports, and configuration
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain model** - `BucketConfig`, `BucketState`, `BucketKey`, `CheckResult`, `AuditEvent`
//! - **The decision function** - `domain::bucket::decide`, a pure token-bucket transition
//! - **Port definitions** - Traits for adapters: `StoragePort`, `AuditPort`, `MetricsPort`
//! - **Configuration** - `Config` and its sub-sections, loaded from YAML
//!
//! # Architecture
//!
//! This crate follows the hexagonal (ports & adapters) architecture pattern.
//! The domain module contains pure business logic with no external dependencies.
//! Ports define trait interfaces that adapter crates implement.

pub mod config;
pub mod domain;
pub mod ports;
