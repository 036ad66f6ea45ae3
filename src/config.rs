use serde::Deserialize;

use crate::analytics::DEFAULT_TREND_EPSILON;
use crate::reader::ReaderConfig;
use crate::rollup_worker::RollupWorkerConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub rollup: RollupConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
    #[serde(default = "default_raw_retention_days")]
    pub raw_retention_days: u32,
    #[serde(default = "default_rollup_retention_days")]
    pub rollup_retention_days: u32,
}

fn default_raw_retention_days() -> u32 {
    3
}

fn default_rollup_retention_days() -> u32 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_ttl_secs() -> u64 {
    60
}

fn default_max_entries() -> usize {
    10_000
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueryConfig {
    /// Server-side cap on top/bottom/extremes result size.
    #[serde(default = "default_max_limit")]
    pub max_limit: u32,
    #[serde(default = "default_trend_epsilon")]
    pub trend_epsilon: f64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_limit: default_max_limit(),
            trend_epsilon: default_trend_epsilon(),
        }
    }
}

fn default_max_limit() -> u32 {
    1000
}

fn default_trend_epsilon() -> f64 {
    DEFAULT_TREND_EPSILON
}

#[derive(Debug, Clone, Deserialize)]
pub struct RollupConfig {
    #[serde(default = "default_merge_interval_secs")]
    pub merge_interval_secs: u64,
    #[serde(default = "default_settle_secs")]
    pub settle_secs: u64,
    /// Cron expression (local time) for VACUUM; falls back to vacuum_interval_secs.
    #[serde(default)]
    pub vacuum_schedule: Option<String>,
    #[serde(default = "default_vacuum_interval_secs")]
    pub vacuum_interval_secs: u64,
}

impl Default for RollupConfig {
    fn default() -> Self {
        Self {
            merge_interval_secs: default_merge_interval_secs(),
            settle_secs: default_settle_secs(),
            vacuum_schedule: None,
            vacuum_interval_secs: default_vacuum_interval_secs(),
        }
    }
}

fn default_merge_interval_secs() -> u64 {
    60
}

fn default_settle_secs() -> u64 {
    120
}

fn default_vacuum_interval_secs() -> u64 {
    86_400
}

/// Upper bound for both retention knobs (about a century).
pub const MAX_RETENTION_DAYS: u32 = 36_500;

/// Upper bound for rollup.settle_secs (one year).
pub const MAX_SETTLE_SECS: u64 = 365 * 86_400;

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn reader_config(&self) -> ReaderConfig {
        ReaderConfig {
            max_limit: self.query.max_limit,
            trend_epsilon: self.query.trend_epsilon,
        }
    }

    pub fn rollup_worker_config(&self) -> RollupWorkerConfig {
        RollupWorkerConfig {
            merge_interval_secs: self.rollup.merge_interval_secs,
            settle_secs: self.rollup.settle_secs,
            raw_retention_days: self.database.raw_retention_days,
            rollup_retention_days: self.database.rollup_retention_days,
            vacuum_schedule: self.rollup.vacuum_schedule.clone(),
            vacuum_interval_secs: self.rollup.vacuum_interval_secs,
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.database.raw_retention_days > 0,
            "database.raw_retention_days must be > 0, got {}",
            self.database.raw_retention_days
        );
        anyhow::ensure!(
            self.database.rollup_retention_days >= self.database.raw_retention_days,
            "database.rollup_retention_days ({}) must be >= raw_retention_days ({})",
            self.database.rollup_retention_days,
            self.database.raw_retention_days
        );
        anyhow::ensure!(
            self.database.rollup_retention_days <= MAX_RETENTION_DAYS,
            "database.rollup_retention_days must be <= {}, got {}",
            MAX_RETENTION_DAYS,
            self.database.rollup_retention_days
        );
        anyhow::ensure!(
            self.cache.ttl_secs > 0,
            "cache.ttl_secs must be > 0, got {}",
            self.cache.ttl_secs
        );
        anyhow::ensure!(
            self.cache.max_entries > 0,
            "cache.max_entries must be > 0, got {}",
            self.cache.max_entries
        );
        anyhow::ensure!(
            self.query.max_limit > 0,
            "query.max_limit must be > 0, got {}",
            self.query.max_limit
        );
        anyhow::ensure!(
            self.query.trend_epsilon.is_finite() && self.query.trend_epsilon >= 0.0,
            "query.trend_epsilon must be a non-negative number, got {}",
            self.query.trend_epsilon
        );
        anyhow::ensure!(
            self.rollup.merge_interval_secs > 0,
            "rollup.merge_interval_secs must be > 0, got {}",
            self.rollup.merge_interval_secs
        );
        anyhow::ensure!(
            self.rollup.settle_secs <= MAX_SETTLE_SECS,
            "rollup.settle_secs must be <= {}, got {}",
            MAX_SETTLE_SECS,
            self.rollup.settle_secs
        );
        anyhow::ensure!(
            self.rollup.vacuum_interval_secs > 0,
            "rollup.vacuum_interval_secs must be > 0, got {}",
            self.rollup.vacuum_interval_secs
        );
        Ok(())
    }
}

/// Collector agent configuration (separate file from the server's).
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    pub api_url: String,
    pub host: String,
    /// Defaults to the OS hostname.
    #[serde(default)]
    pub vm: Option<String>,
    pub allowed_metrics: Vec<String>,
    /// Metric families to collect; empty means all.
    #[serde(default)]
    pub enabled: Vec<String>,
    /// 0 runs a single collection and exits.
    #[serde(default)]
    pub interval_secs: u64,
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
}

fn default_send_timeout_secs() -> u64 {
    3
}

impl AgentConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("AGENT_CONFIG_FILE").unwrap_or_else(|_| "agent.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AgentConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(!self.api_url.is_empty(), "api_url must be non-empty");
        anyhow::ensure!(!self.host.is_empty(), "host must be non-empty");
        anyhow::ensure!(
            self.send_timeout_secs > 0,
            "send_timeout_secs must be > 0, got {}",
            self.send_timeout_secs
        );
        Ok(())
    }
}
