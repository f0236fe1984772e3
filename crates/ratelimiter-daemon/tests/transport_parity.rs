//! Integration test: HTTP and RPC transports against the same service.
//!
//! Wires a `RateLimitService` over in-memory storage once, serves it over
//! both `HttpServer` and the `tonic` `RateLimiterService` service, and
//! asserts the two transports agree on the same bucket.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tonic::transport::Server as TonicServer;

use ratelimiter_audit::{AuditLogger, InMemoryAuditPort};
use ratelimiter_core::config::{BucketConfigEntry, BucketsConfig, FailurePolicy};
use ratelimiter_http::HttpServer;
use ratelimiter_metrics::PrometheusMetrics;
use ratelimiter_rpc::proto::rate_limiter_service_client::RateLimiterServiceClient;
use ratelimiter_rpc::proto::rate_limiter_service_server::RateLimiterServiceServer;
use ratelimiter_rpc::proto::CheckReq as RpcCheckRequest;
use ratelimiter_rpc::RateLimiterRpc;
use ratelimiter_service::{AuditFanout, RateLimitService};
use ratelimiter_storage::InMemoryStoragePort;

const HTTP_ADDR: &str = "127.0.0.1:18180";
const RPC_ADDR: &str = "127.0.0.1:18181";

async fn spawn_transports() -> (Arc<RateLimitService>, CancellationToken) {
    let metrics = Arc::new(PrometheusMetrics::new(None).unwrap());
    let audit_port = Arc::new(InMemoryAuditPort::new());
    let logger = Arc::new(AuditLogger::new(audit_port, "rate-limit.audit"));
    let (fanout, _handles) = AuditFanout::spawn(logger, metrics.clone(), 2, 64);

    let mut overrides = HashMap::new();
    overrides.insert(
        "upload".to_string(),
        BucketConfigEntry {
            capacity: 5.0,
            refill_rate: 1.0,
        },
    );
    let buckets = Arc::new(BucketsConfig {
        default: BucketConfigEntry {
            capacity: 100.0,
            refill_rate: 1.0,
        },
        overrides,
    });

    let service = Arc::new(RateLimitService::new(
        Arc::new(InMemoryStoragePort::new()),
        metrics.clone(),
        Arc::new(fanout),
        buckets,
        FailurePolicy::FailOpen,
        Duration::from_millis(200),
    ));

    let shutdown = CancellationToken::new();

    let http_server = HttpServer::new(service.clone(), metrics.clone(), HTTP_ADDR).unwrap();
    let http_shutdown = shutdown.clone();
    tokio::spawn(async move { http_server.run(http_shutdown).await });

    let rpc_service = RateLimiterRpc::new(service.clone());
    let rpc_shutdown = shutdown.clone();
    let rpc_addr = RPC_ADDR.parse().unwrap();
    tokio::spawn(async move {
        TonicServer::builder()
            .add_service(RateLimiterServiceServer::new(rpc_service))
            .serve_with_shutdown(rpc_addr, rpc_shutdown.cancelled())
            .await
    });

    // Give both accept loops a moment to bind before clients connect.
    tokio::time::sleep(Duration::from_millis(50)).await;

    (service, shutdown)
}

#[tokio::test]
async fn http_and_rpc_agree_on_a_shared_bucket() {
    let (_service, shutdown) = spawn_transports().await;

    let http_client = reqwest::Client::new();
    let http_response: serde_json::Value = http_client
        .post(format!("http://{HTTP_ADDR}/check"))
        .json(&serde_json::json!({
            "clientId": "shared-client",
            "resource": "upload",
            "cost": 1.0
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(http_response["allowed"], true);
    assert_eq!(http_response["remaining"], 4);

    let mut rpc_client = RateLimiterServiceClient::connect(format!("http://{RPC_ADDR}"))
        .await
        .unwrap();
    let rpc_response = rpc_client
        .check(RpcCheckRequest {
            client_id: "shared-client".to_string(),
            resource: "upload".to_string(),
            cost: 1,
        })
        .await
        .unwrap()
        .into_inner();

    assert!(rpc_response.allowed);
    assert_eq!(rpc_response.remaining, 3);

    shutdown.cancel();
}

#[tokio::test]
async fn http_health_endpoint_reports_ok() {
    let (_service, shutdown) = spawn_transports().await;

    let response = reqwest::get(format!("http://{HTTP_ADDR}/health"))
        .await
        .unwrap();
    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["status"], "ok");

    shutdown.cancel();
}
