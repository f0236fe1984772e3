//! `RateLimiterRpc` - the `tonic` server implementation of the
//! `RateLimiterService` proto service, delegating every call straight to
//! [`RateLimitService`].

use std::sync::Arc;

use tonic::{Request, Response, Status};

use ratelimiter_core::domain::check::CheckResult;
use ratelimiter_core::domain::errors::DomainError;
use ratelimiter_service::{RateLimitService, ServiceError};

use crate::proto::rate_limiter_service_server::RateLimiterService;
use crate::proto::{CheckReq, CheckResp, QuotaReq, QuotaResp};

/// Binary RPC adapter over [`RateLimitService`].
pub struct RateLimiterRpc {
    service: Arc<RateLimitService>,
}

impl RateLimiterRpc {
    pub fn new(service: Arc<RateLimitService>) -> Self {
        Self { service }
    }
}

#[tonic::async_trait]
impl RateLimiterService for RateLimiterRpc {
    async fn check(&self, request: Request<CheckReq>) -> Result<Response<CheckResp>, Status> {
        let req = request.into_inner();
        let result = self
            .service
            .check(&req.client_id, &req.resource, req.cost as f64)
            .await
            .map_err(service_error_to_status)?;
        Ok(Response::new(result.into()))
    }

    async fn get_quota(
        &self,
        request: Request<QuotaReq>,
    ) -> Result<Response<QuotaResp>, Status> {
        let req = request.into_inner();
        let result = self
            .service
            .check_quota(&req.client_id, &req.resource)
            .await
            .map_err(service_error_to_status)?;
        Ok(Response::new(QuotaResp {
            current_usage: (result.limit - result.remaining) as i32,
            limit: result.limit as i32,
        }))
    }
}

impl From<CheckResult> for CheckResp {
    fn from(r: CheckResult) -> Self {
        Self {
            allowed: r.allowed,
            remaining: r.remaining as i32,
            limit: r.limit as i32,
            reset_at: r.reset_at,
            retry_after: r.retry_after as i32,
        }
    }
}

/// Validation failures map to `INVALID_ARGUMENT`; there is no other error
/// variant `RateLimitService::check` can return.
fn service_error_to_status(err: ServiceError) -> Status {
    match err {
        ServiceError::Validation(domain_err) => match domain_err {
            DomainError::EmptyClientId
            | DomainError::EmptyResource
            | DomainError::KeySeparatorInField { .. }
            | DomainError::NonFiniteCost(_)
            | DomainError::NegativeCost(_) => Status::invalid_argument(domain_err.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use ratelimiter_audit::{AuditLogger, InMemoryAuditPort};
    use ratelimiter_core::config::{BucketConfigEntry, BucketsConfig, FailurePolicy};
    use ratelimiter_metrics::PrometheusMetrics;
    use ratelimiter_service::AuditFanout;
    use ratelimiter_storage::InMemoryStoragePort;

    use super::*;

    fn test_rpc() -> RateLimiterRpc {
        let metrics = Arc::new(PrometheusMetrics::new(None).unwrap());
        let audit_port = Arc::new(InMemoryAuditPort::new());
        let logger = Arc::new(AuditLogger::new(audit_port, "rate-limit.audit"));
        let (fanout, _handles) = AuditFanout::spawn(logger, metrics.clone(), 2, 16);

        let mut overrides = HashMap::new();
        overrides.insert(
            "upload".to_string(),
            BucketConfigEntry {
                capacity: 10.0,
                refill_rate: 1.0,
            },
        );
        let buckets = Arc::new(BucketsConfig {
            default: BucketConfigEntry {
                capacity: 100.0,
                refill_rate: 100.0 / 60.0,
            },
            overrides,
        });

        let service = Arc::new(RateLimitService::new(
            Arc::new(InMemoryStoragePort::new()),
            metrics,
            Arc::new(fanout),
            buckets,
            FailurePolicy::FailOpen,
            Duration::from_millis(100),
        ));

        RateLimiterRpc::new(service)
    }

    #[tokio::test]
    async fn check_allows_within_capacity() {
        let rpc = test_rpc();
        let request = Request::new(CheckReq {
            client_id: "client-a".to_string(),
            resource: "upload".to_string(),
            cost: 1,
        });

        let response = rpc.check(request).await.unwrap().into_inner();
        assert!(response.allowed);
        assert_eq!(response.remaining, 9);
        assert_eq!(response.limit, 10);
    }

    #[tokio::test]
    async fn check_rejects_empty_client_id_as_invalid_argument() {
        let rpc = test_rpc();
        let request = Request::new(CheckReq {
            client_id: String::new(),
            resource: "upload".to_string(),
            cost: 1,
        });

        let status = rpc.check(request).await.unwrap_err();
        assert_eq!(status.code(), tonic::Code::InvalidArgument);
    }

    #[tokio::test]
    async fn get_quota_never_decrements_usage() {
        let rpc = test_rpc();

        let first = rpc
            .get_quota(Request::new(QuotaReq {
                client_id: "client-a".to_string(),
                resource: "upload".to_string(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(first.current_usage, 0);
        assert_eq!(first.limit, 10);

        let second = rpc
            .get_quota(Request::new(QuotaReq {
                client_id: "client-a".to_string(),
                resource: "upload".to_string(),
            }))
            .await
            .unwrap()
            .into_inner();
        assert_eq!(second.current_usage, 0);
    }
}
