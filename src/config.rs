use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::models::DEFAULT_PERIOD_SECS;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub report: ReportConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: u32,
}

fn default_max_pool_size() -> u32 {
    5
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportConfig {
    /// Endpoints to produce reports for (static list).
    pub endpoints: Vec<String>,
    #[serde(default = "default_period_secs")]
    pub period_secs: u32,
    /// RFC3339, e.g. "2024-05-01T00:00:00Z". When unset, backfill starts at the earliest sample.
    #[serde(default)]
    pub start_timestamp: Option<DateTime<Utc>>,
    /// Pause once caught up with the present.
    #[serde(default = "default_wait_interval_secs")]
    pub wait_interval_secs: u64,
    /// Pause when another aggregation cycle is in flight.
    #[serde(default = "default_backoff_interval_ms")]
    pub backoff_interval_ms: u64,
    #[serde(default = "default_max_concurrent_endpoints")]
    pub max_concurrent_endpoints: usize,
}

fn default_period_secs() -> u32 {
    DEFAULT_PERIOD_SECS
}

fn default_wait_interval_secs() -> u64 {
    15
}

fn default_backoff_interval_ms() -> u64 {
    1000
}

fn default_max_concurrent_endpoints() -> usize {
    4
}

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
            !self.report.endpoints.is_empty(),
            "report.endpoints must list at least one endpoint"
        );
        anyhow::ensure!(
            self.report.endpoints.iter().all(|e| !e.trim().is_empty()),
            "report.endpoints must not contain blank entries"
        );
        let unique: HashSet<&str> = self.report.endpoints.iter().map(String::as_str).collect();
        anyhow::ensure!(
            unique.len() == self.report.endpoints.len(),
            "report.endpoints must not contain duplicates"
        );
        anyhow::ensure!(
            self.report.period_secs > 0,
            "report.period_secs must be > 0, got {}",
            self.report.period_secs
        );
        anyhow::ensure!(
            self.report.wait_interval_secs > 0,
            "report.wait_interval_secs must be > 0, got {}",
            self.report.wait_interval_secs
        );
        anyhow::ensure!(
            self.report.backoff_interval_ms > 0,
            "report.backoff_interval_ms must be > 0, got {}",
            self.report.backoff_interval_ms
        );
        anyhow::ensure!(
            self.report.max_concurrent_endpoints > 0,
            "report.max_concurrent_endpoints must be > 0, got {}",
            self.report.max_concurrent_endpoints
        );
        Ok(())
    }
}
