//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use queue::QueueConfig;
use saga::{BatchMode, PurchasePolicy, RandomQuantities, RuntimeOptions, WorkerConfig};
use store::scan::MAX_PAGE_LIMIT;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` / `PORT`: bind address (default `0.0.0.0:3000`)
/// - `RUST_LOG`: tracing filter directive (default `info`)
/// - `LOG_FORMAT`: `pretty` or `json` (default `pretty`)
/// - `DATABASE_URL`: PostgreSQL store; the in-memory store is used when unset
/// - `QUEUE_BATCH_SIZE`, `QUEUE_MAX_CONCURRENCY`, `QUEUE_VISIBILITY_TIMEOUT_SECS`,
///   `QUEUE_MAX_RECEIVE_COUNT`, `QUEUE_POLL_INTERVAL_MS`: queue consumption
/// - `SCAN_PAGE_LIMIT`: default page size of list endpoints, at most
///   [`MAX_PAGE_LIMIT`]
/// - `PURCHASE_MAX_DRAW`, `PURCHASE_MAX_DRAWS`: purchase loop bounds
/// - `IDEMPOTENCY_RETENTION_HOURS`: age at which idempotency keys are pruned
///
/// Unparseable values fall back to the default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub batch_size: usize,
    pub max_concurrency: usize,
    pub visibility_timeout: Duration,
    pub max_receive_count: u32,
    pub poll_interval: Duration,
    pub page_limit: usize,
    pub purchase_max_draw: u32,
    pub purchase_max_draws: u32,
    pub key_retention: Duration,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let lookup = &lookup;

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: parsed(lookup, "PORT").unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.log_format),
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            batch_size: parsed(lookup, "QUEUE_BATCH_SIZE").unwrap_or(defaults.batch_size),
            max_concurrency: parsed(lookup, "QUEUE_MAX_CONCURRENCY")
                .unwrap_or(defaults.max_concurrency),
            visibility_timeout: parsed(lookup, "QUEUE_VISIBILITY_TIMEOUT_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.visibility_timeout),
            max_receive_count: parsed(lookup, "QUEUE_MAX_RECEIVE_COUNT")
                .unwrap_or(defaults.max_receive_count),
            poll_interval: parsed(lookup, "QUEUE_POLL_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
            page_limit: parsed(lookup, "SCAN_PAGE_LIMIT")
                .unwrap_or(defaults.page_limit)
                .clamp(1, MAX_PAGE_LIMIT),
            purchase_max_draw: parsed(lookup, "PURCHASE_MAX_DRAW")
                .unwrap_or(defaults.purchase_max_draw),
            purchase_max_draws: parsed(lookup, "PURCHASE_MAX_DRAWS")
                .unwrap_or(defaults.purchase_max_draws),
            key_retention: parsed(lookup, "IDEMPOTENCY_RETENTION_HOURS")
                .map(|hours: u64| Duration::from_secs(hours.saturating_mul(60 * 60)))
                .unwrap_or(defaults.key_retention),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn queue_config(&self) -> QueueConfig {
        QueueConfig {
            visibility_timeout: self.visibility_timeout,
            max_receive_count: self.max_receive_count.max(1),
        }
    }

    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            batch_size: self.batch_size.max(1),
            max_concurrency: self.max_concurrency.max(1),
            poll_interval: self.poll_interval,
        }
    }

    pub fn purchase_policy(&self) -> PurchasePolicy {
        PurchasePolicy::new(self.purchase_max_draw, self.purchase_max_draws)
    }

    /// Saga runtime settings. Quantities are drawn at random.
    pub fn runtime_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            worker: self.worker_config(),
            mode: BatchMode::Sequential,
            purchasing: self.purchase_policy(),
            quantities: Arc::new(RandomQuantities),
            key_retention: self.key_retention,
            ..RuntimeOptions::default()
        }
    }
}

/// Reads and parses one variable. Absent or unparseable values are `None`.
fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
    lookup(name).and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        let queue = QueueConfig::default();
        let worker = WorkerConfig::default();
        let purchasing = PurchasePolicy::default();
        let runtime = RuntimeOptions::default();

        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            database_url: None,
            batch_size: worker.batch_size,
            max_concurrency: worker.max_concurrency,
            visibility_timeout: queue.visibility_timeout,
            max_receive_count: queue.max_receive_count,
            poll_interval: worker.poll_interval,
            page_limit: store::scan::DEFAULT_PAGE_LIMIT,
            purchase_max_draw: purchasing.max_draw,
            purchase_max_draws: purchasing.max_draws,
            key_retention: runtime.key_retention,
        }
    }
}
