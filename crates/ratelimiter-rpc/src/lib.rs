//! Binary RPC transport surface (C7): `tonic`/`prost` over the same
//! `Check`/`GetQuota` operations the HTTP surface exposes, for callers that
//! want a typed contract instead of JSON.

pub mod proto {
    tonic::include_proto!("ratelimiter.v1");
}

pub mod service;

pub use service::RateLimiterRpc;
