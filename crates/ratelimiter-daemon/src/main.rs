//! Rate limiter daemon entrypoint.
//!
//! Loads configuration, wires the storage/audit/metrics adapters to
//! [`RateLimitService`], and serves both the HTTP and RPC transports
//! concurrently until a shutdown signal arrives.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tonic::transport::Server as TonicServer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ratelimiter_audit::{AuditLogger, HttpSinkAuditPort};
use ratelimiter_core::config::Config;
use ratelimiter_http::HttpServer;
use ratelimiter_metrics::PrometheusMetrics;
use ratelimiter_rpc::proto::rate_limiter_service_server::RateLimiterServiceServer;
use ratelimiter_rpc::RateLimiterRpc;
use ratelimiter_service::{AuditFanout, RateLimitService};
use ratelimiter_storage::RedisStoragePort;

#[derive(Debug, Parser)]
#[command(name = "ratelimiter-daemon", version, about = "Distributed rate limiter service")]
struct Cli {
    /// Path to the YAML configuration file. Falls back to built-in defaults
    /// (with environment overrides still applied) if unset or unreadable.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    info!(config_path = %config_path.display(), "starting rate limiter daemon");

    let storage = Arc::new(RedisStoragePort::new(&config.storage.url)?);
    let metrics = Arc::new(PrometheusMetrics::new(config.metrics.cardinality_cap)?);

    let audit_port = Arc::new(HttpSinkAuditPort::new(config.audit.sink_url.clone()));
    let logger = Arc::new(AuditLogger::new(audit_port, config.audit.topic.clone()));
    let (fanout, audit_handles) = AuditFanout::spawn(
        logger,
        metrics.clone(),
        config.audit.worker_count,
        config.audit.queue_capacity,
    );

    let service = Arc::new(RateLimitService::new(
        storage,
        metrics.clone(),
        Arc::new(fanout),
        Arc::new(config.buckets.clone()),
        config.failure_policy,
        Duration::from_millis(config.deadline_ms),
    ));

    let shutdown = CancellationToken::new();

    let http_server = HttpServer::new(service.clone(), metrics.clone(), &config.http.bind_addr)
        .context("failed to bind HTTP server")?;
    let http_shutdown = shutdown.clone();
    let http_task = tokio::spawn(async move { http_server.run(http_shutdown).await });

    let rpc_addr = config
        .rpc
        .bind_addr
        .parse()
        .context("invalid rpc.bind_addr")?;
    let rpc_service = RateLimiterRpc::new(service.clone());
    let rpc_shutdown = shutdown.clone();
    info!(addr = %rpc_addr, "RPC server listening");
    let rpc_task = tokio::spawn(async move {
        TonicServer::builder()
            .add_service(RateLimiterServiceServer::new(rpc_service))
            .serve_with_shutdown(rpc_addr, rpc_shutdown.cancelled())
            .await
    });

    wait_for_shutdown_signal().await;
    info!("shutdown signal received, draining in-flight work");
    shutdown.cancel();

    if let Err(e) = http_task.await {
        error!(error = %e, "HTTP server task panicked");
    }
    if let Err(e) = rpc_task.await {
        error!(error = %e, "RPC server task panicked");
    }

    // Audit workers drain once every `AuditFanout` sender is dropped; the
    // only senders are the ones `RateLimitService` holds via its `Arc`, so
    // dropping `service` here lets each worker's `recv()` observe the end of
    // the queue and return, then we await them to flush in-flight publishes.
    drop(service);
    for handle in audit_handles {
        let _ = handle.await;
    }

    info!("shutdown complete");
    Ok(())
}

/// Waits for either Ctrl+C or, on Unix, `SIGTERM` — matching how a daemon
/// run under a process supervisor is actually stopped.
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
