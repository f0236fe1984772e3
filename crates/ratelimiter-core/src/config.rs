//! Configuration module for the rate limiter.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, defaults, and environment-variable overrides for
//! values that should not live in a checked-in file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::bucket::BucketConfig;

/// Top-level configuration for the rate limiter daemon.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub buckets: BucketsConfig,
    pub storage: StorageConfig,
    pub audit: AuditConfig,
    pub metrics: MetricsConfig,
    pub http: HttpConfig,
    pub rpc: RpcConfig,
    /// Per-request deadline, in milliseconds.
    pub deadline_ms: u64,
    /// What to do when storage is unreachable or CAS retries are exhausted.
    pub failure_policy: FailurePolicy,
    pub logging: LoggingConfig,
}

/// Resource-class bucket configuration: a default plus named overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketsConfig {
    pub default: BucketConfigEntry,
    /// Per-resource overrides, keyed by resource class name.
    #[serde(default)]
    pub overrides: std::collections::HashMap<String, BucketConfigEntry>,
}

impl BucketsConfig {
    /// Resolves the effective [`BucketConfig`] for a resource class,
    /// falling back to `default` for unknown resources.
    pub fn resolve(&self, resource: &str) -> BucketConfig {
        let entry = self.overrides.get(resource).unwrap_or(&self.default);
        BucketConfig::new(entry.capacity, entry.refill_rate)
    }
}

/// Serializable mirror of [`BucketConfig`] (keeps the domain type free of `serde`
/// derive requirements beyond what it already needs for wire encoding).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BucketConfigEntry {
    pub capacity: f64,
    pub refill_rate: f64,
}

/// Storage adapter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Redis connection URL. Overridable via `RATE_LIMITER_STORAGE_URL`.
    pub url: String,
    pub connect_timeout_ms: u64,
}

/// Audit fan-out settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditConfig {
    /// HTTP sink URL events are POSTed to. Overridable via `RATE_LIMITER_AUDIT_SINK_URL`.
    pub sink_url: String,
    pub topic: String,
    /// Capacity of each per-shard outbound queue.
    pub queue_capacity: usize,
    /// Number of parallel fan-out workers (shards), hashed on `client_id`.
    pub worker_count: usize,
}

/// Metrics adapter settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// When set, `client_id` label values are hashed into this many buckets
    /// to bound cardinality. `None` disables capping.
    pub cardinality_cap: Option<u32>,
}

/// HTTP transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub bind_addr: String,
}

/// Binary RPC transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    pub bind_addr: String,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`. `RUST_LOG`
    /// takes precedence if set.
    pub level: String,
}

/// Policy applied when storage is unreachable or CAS retries are exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Admit the request; availability over strict accounting.
    #[default]
    FailOpen,
    /// Deny the request; strict accounting over availability.
    FailClosed,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            buckets: BucketsConfig {
                default: BucketConfigEntry {
                    capacity: 100.0,
                    refill_rate: 100.0 / 60.0,
                },
                overrides: std::collections::HashMap::new(),
            },
            storage: StorageConfig {
                url: "redis://127.0.0.1:6379".to_string(),
                connect_timeout_ms: 500,
            },
            audit: AuditConfig {
                sink_url: "http://127.0.0.1:8089/audit".to_string(),
                topic: "rate-limit.audit".to_string(),
                queue_capacity: 1024,
                worker_count: 4,
            },
            metrics: MetricsConfig {
                cardinality_cap: None,
            },
            http: HttpConfig {
                bind_addr: "0.0.0.0:8080".to_string(),
            },
            rpc: RpcConfig {
                bind_addr: "0.0.0.0:8081".to_string(),
            },
            deadline_ms: 100,
            failure_policy: FailurePolicy::FailOpen,
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from a YAML file at `path`, then apply environment
    /// overrides for values that should not live in a checked-in file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = serde_yaml::from_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] (with env
    /// overrides still applied) on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|_| {
            let mut config = Config::default();
            config.apply_env_overrides();
            config
        })
    }

    /// Applies `RATE_LIMITER_STORAGE_URL` / `RATE_LIMITER_AUDIT_SINK_URL`
    /// overrides, matching the pattern of keeping endpoints/secrets out of a
    /// checked-in config file.
    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("RATE_LIMITER_STORAGE_URL") {
            self.storage.url = url;
        }
        if let Ok(url) = std::env::var("RATE_LIMITER_AUDIT_SINK_URL") {
            self.audit.sink_url = url;
        }
    }

    /// Platform-appropriate default path for the configuration file.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("ratelimiter")
            .join("config.yaml")
    }
}
