//! Raw `hyper` HTTP transport surface.
//!
//! Near-direct adaptation of the reference `MetricsServer`: one
//! `TcpListener::accept` loop, a `hyper::service::service_fn` per connection,
//! graceful shutdown via `tokio_util::sync::CancellationToken`. Generalized
//! from a single `/metrics` route to `/check`, `/health`, `/health/live`,
//! and `/metrics`.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use ratelimiter_core::domain::check::CheckResult;
use ratelimiter_metrics::PrometheusMetrics;
use ratelimiter_service::RateLimitService;

/// `POST /check` request body: `{clientId, resource, cost?}`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CheckRequest {
    client_id: String,
    resource: String,
    #[serde(default)]
    cost: Option<f64>,
}

/// `POST /check` response body: `{allowed, remaining, limit, resetAt, retryAfter}`.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct CheckResponse {
    allowed: bool,
    remaining: u32,
    limit: u32,
    reset_at: i64,
    retry_after: u32,
}

impl From<CheckResult> for CheckResponse {
    fn from(r: CheckResult) -> Self {
        Self {
            allowed: r.allowed,
            remaining: r.remaining,
            limit: r.limit,
            reset_at: r.reset_at,
            retry_after: r.retry_after,
        }
    }
}

impl CheckResponse {
    /// The wire-compat "deny and zero" response used for validation
    /// failures — preserves the always-200 contract expected by callers.
    fn wire_compat_zero() -> Self {
        CheckResult::denied_zero().into()
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    timestamp: String,
    uptime: u64,
}

/// HTTP server exposing `POST /check`, `GET /health`, `GET /health/live`,
/// and `GET /metrics`.
pub struct HttpServer {
    service: Arc<RateLimitService>,
    metrics: Arc<PrometheusMetrics>,
    addr: SocketAddr,
    started_at: Instant,
}

impl HttpServer {
    pub fn new(
        service: Arc<RateLimitService>,
        metrics: Arc<PrometheusMetrics>,
        bind_addr: &str,
    ) -> anyhow::Result<Self> {
        let addr: SocketAddr = bind_addr.parse()?;
        Ok(Self {
            service,
            metrics,
            addr,
            started_at: Instant::now(),
        })
    }

    /// Runs the accept loop until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.addr).await?;
        info!(addr = %self.addr, "HTTP server listening");

        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, _) = result?;
                    let io = TokioIo::new(stream);
                    let service = Arc::clone(&self.service);
                    let metrics = Arc::clone(&self.metrics);
                    let started_at = self.started_at;

                    tokio::spawn(async move {
                        let conn_service = service_fn(move |req| {
                            let service = Arc::clone(&service);
                            let metrics = Arc::clone(&metrics);
                            async move { handle_request(req, service, metrics, started_at).await }
                        });

                        if let Err(e) = http1::Builder::new().serve_connection(io, conn_service).await {
                            error!(error = %e, "HTTP connection error");
                        }
                    });
                }
                _ = shutdown.cancelled() => {
                    info!("HTTP server shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}

async fn handle_request(
    req: Request<Incoming>,
    service: Arc<RateLimitService>,
    metrics: Arc<PrometheusMetrics>,
    started_at: Instant,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let body = if method == Method::POST {
        match req.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(e) => {
                warn!(error = %e, "failed to read request body");
                Bytes::new()
            }
        }
    } else {
        Bytes::new()
    };

    Ok(route(&method, &path, body, &service, &metrics, started_at).await)
}

/// Routing plus handler logic, factored out of `handle_request` so it can be
/// exercised directly in tests without a real TCP connection.
async fn route(
    method: &Method,
    path: &str,
    body: Bytes,
    service: &RateLimitService,
    metrics: &PrometheusMetrics,
    started_at: Instant,
) -> Response<Full<Bytes>> {
    match (method, path) {
        (&Method::POST, "/check") => handle_check(body, service).await,
        (&Method::GET, "/health") => health_response("ok", started_at),
        (&Method::GET, "/health/live") => health_response("alive", started_at),
        (&Method::GET, "/metrics") => handle_metrics(metrics),
        _ => not_found(),
    }
}

async fn handle_check(body: Bytes, service: &RateLimitService) -> Response<Full<Bytes>> {
    let parsed: CheckRequest = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "malformed /check request body");
            return json_response(StatusCode::OK, &CheckResponse::wire_compat_zero());
        }
    };

    let cost = parsed.cost.unwrap_or(1.0);
    let response = match service.check(&parsed.client_id, &parsed.resource, cost).await {
        Ok(result) => result.into(),
        Err(e) => {
            warn!(
                error = %e,
                client_id = %parsed.client_id,
                resource = %parsed.resource,
                "validation failed for /check request"
            );
            CheckResponse::wire_compat_zero()
        }
    };

    json_response(StatusCode::OK, &response)
}

fn health_response(status: &str, started_at: Instant) -> Response<Full<Bytes>> {
    let body = HealthResponse {
        status: status.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        uptime: started_at.elapsed().as_secs(),
    };
    json_response(StatusCode::OK, &body)
}

fn handle_metrics(metrics: &PrometheusMetrics) -> Response<Full<Bytes>> {
    match metrics.encode() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header("Content-Type", "text/plain; version=0.0.4; charset=utf-8")
            .body(Full::new(Bytes::from(body)))
            .unwrap(),
        Err(e) => Response::builder()
            .status(StatusCode::INTERNAL_SERVER_ERROR)
            .body(Full::new(Bytes::from(format!(
                "failed to encode metrics: {e}"
            ))))
            .unwrap(),
    }
}

fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_vec(body).unwrap_or_default();
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(json)))
        .unwrap()
}

fn not_found() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .body(Full::new(Bytes::from("Not Found")))
        .unwrap()
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::time::Duration;

    use ratelimiter_audit::{AuditLogger, InMemoryAuditPort};
    use ratelimiter_core::config::{BucketConfigEntry, BucketsConfig, FailurePolicy};
    use ratelimiter_service::AuditFanout;
    use ratelimiter_storage::InMemoryStoragePort;

    use super::*;

    fn test_server_state() -> (Arc<RateLimitService>, Arc<PrometheusMetrics>) {
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
            metrics.clone(),
            Arc::new(fanout),
            buckets,
            FailurePolicy::FailOpen,
            Duration::from_millis(100),
        ));

        (service, metrics)
    }

    #[tokio::test]
    async fn check_allows_within_capacity() {
        let (service, metrics) = test_server_state();
        let body = Bytes::from(r#"{"clientId":"client-a","resource":"upload","cost":1}"#);

        let response = route(
            &Method::POST,
            "/check",
            body,
            &service,
            &metrics,
            Instant::now(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["allowed"], true);
        assert_eq!(parsed["remaining"], 9);
        assert_eq!(parsed["limit"], 10);
    }

    #[tokio::test]
    async fn check_defaults_cost_to_one_when_omitted() {
        let (service, metrics) = test_server_state();
        let body = Bytes::from(r#"{"clientId":"client-a","resource":"upload"}"#);

        let response = route(
            &Method::POST,
            "/check",
            body,
            &service,
            &metrics,
            Instant::now(),
        )
        .await;

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["remaining"], 9);
    }

    #[tokio::test]
    async fn check_validation_error_returns_wire_compat_zero_with_200() {
        let (service, metrics) = test_server_state();
        let body = Bytes::from(r#"{"clientId":"","resource":"upload"}"#);

        let response = route(
            &Method::POST,
            "/check",
            body,
            &service,
            &metrics,
            Instant::now(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: CheckResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed, CheckResponse::wire_compat_zero());
    }

    #[tokio::test]
    async fn check_malformed_json_returns_wire_compat_zero_with_200() {
        let (service, metrics) = test_server_state();
        let body = Bytes::from(r#"{not valid json"#);

        let response = route(
            &Method::POST,
            "/check",
            body,
            &service,
            &metrics,
            Instant::now(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: CheckResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed, CheckResponse::wire_compat_zero());
    }

    #[tokio::test]
    async fn health_reports_ok_status() {
        let (service, metrics) = test_server_state();
        let response = route(
            &Method::GET,
            "/health",
            Bytes::new(),
            &service,
            &metrics,
            Instant::now(),
        )
        .await;

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "ok");
    }

    #[tokio::test]
    async fn health_live_reports_alive_status() {
        let (service, metrics) = test_server_state();
        let response = route(
            &Method::GET,
            "/health/live",
            Bytes::new(),
            &service,
            &metrics,
            Instant::now(),
        )
        .await;

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed["status"], "alive");
    }

    #[tokio::test]
    async fn metrics_endpoint_reflects_recorded_checks() {
        let (service, metrics) = test_server_state();
        service.check("client-a", "upload", 1.0).await.unwrap();

        let response = route(
            &Method::GET,
            "/metrics",
            Bytes::new(),
            &service,
            &metrics,
            Instant::now(),
        )
        .await;

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("rate_limit_checks_total"));
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let (service, metrics) = test_server_state();
        let response = route(
            &Method::GET,
            "/nonexistent",
            Bytes::new(),
            &service,
            &metrics,
            Instant::now(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn new_rejects_malformed_bind_addr() {
        let (service, metrics) = test_server_state();
        let result = HttpServer::new(service, metrics, "not-an-address");
        assert!(result.is_err());
    }
}
