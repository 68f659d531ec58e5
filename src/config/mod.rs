//! Configuration management for the niward monitor
//!
//! This module handles loading and validating configuration from environment variables,
//! TOML files, and command-line arguments.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::platform::WebhookConfig;
use crate::probe::fallback::DEFAULT_BASE_URL;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reconciliation loop configuration
    pub monitor: MonitorConfig,

    /// Native probe configuration
    pub probe: ProbeConfig,

    /// Aggregator fallback configuration
    pub fallback: FallbackConfig,

    /// Status cache configuration
    pub cache: CacheConfig,

    /// Store file locations
    pub storage: StorageConfig,

    /// Messaging platform configuration
    pub platform: PlatformConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Reconciliation loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between ticks
    pub interval_secs: u64,

    /// Pause between endpoints within a tick, in milliseconds
    pub endpoint_delay_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            interval_secs: 60,
            endpoint_delay_ms: 1000,
        }
    }
}

/// Native probe configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Deadline for one status query, in seconds
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self { timeout_secs: 5 }
    }
}

/// Aggregator fallback configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub enabled: bool,

    /// Aggregator base URL
    pub base_url: String,

    /// Deadline for one lookup, in seconds
    pub timeout_secs: u64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 5,
        }
    }
}

/// Status cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Classification time-to-live in seconds
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 30 }
    }
}

/// Store file locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Registration store (owner id → registration)
    pub registrations_path: PathBuf,

    /// Statistics store (endpoint key → record)
    pub statistics_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            registrations_path: PathBuf::from("data/servers.json"),
            statistics_path: PathBuf::from("data/stats.json"),
        }
    }
}

/// Messaging platform configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Retries on rate limits and server errors
    pub max_retries: u32,

    /// Default destination for transition alerts
    pub alert_channel: Option<String>,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            max_retries: 2,
            alert_channel: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse::<T>().ok())
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env();
        Ok(config)
    }

    /// Override fields from `NIWARD_*` environment variables
    pub fn apply_env(&mut self) {
        if let Some(v) = env_parse("NIWARD_INTERVAL_SECS") {
            self.monitor.interval_secs = v;
        }
        if let Some(v) = env_parse("NIWARD_ENDPOINT_DELAY_MS") {
            self.monitor.endpoint_delay_ms = v;
        }
        if let Some(v) = env_parse("NIWARD_PROBE_TIMEOUT") {
            self.probe.timeout_secs = v;
        }
        if let Some(v) = env_parse("NIWARD_FALLBACK_ENABLED") {
            self.fallback.enabled = v;
        }
        if let Ok(v) = std::env::var("NIWARD_FALLBACK_URL") {
            self.fallback.base_url = v;
        }
        if let Some(v) = env_parse("NIWARD_FALLBACK_TIMEOUT") {
            self.fallback.timeout_secs = v;
        }
        if let Some(v) = env_parse("NIWARD_CACHE_TTL") {
            self.cache.ttl_secs = v;
        }
        if let Ok(v) = std::env::var("NIWARD_REGISTRATIONS_PATH") {
            self.storage.registrations_path = v.into();
        }
        if let Ok(v) = std::env::var("NIWARD_STATISTICS_PATH") {
            self.storage.statistics_path = v.into();
        }
        if let Ok(v) = std::env::var("NIWARD_ALERT_CHANNEL") {
            self.platform.alert_channel = Some(v).filter(|s| !s.is_empty());
        }
        if let Ok(v) = std::env::var("NIWARD_LOG_LEVEL") {
            self.logging.level = v;
        }
        if let Ok(v) = std::env::var("NIWARD_LOG_FORMAT") {
            self.logging.format = v;
        }
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.monitor.interval_secs == 0 {
            anyhow::bail!("monitor.interval_secs must be greater than 0");
        }

        if self.probe.timeout_secs == 0 {
            anyhow::bail!("probe.timeout_secs must be greater than 0");
        }

        if self.fallback.enabled {
            if self.fallback.timeout_secs == 0 {
                anyhow::bail!("fallback.timeout_secs must be greater than 0");
            }
            if !self.fallback.base_url.starts_with("http://")
                && !self.fallback.base_url.starts_with("https://")
            {
                anyhow::bail!("fallback.base_url must start with http:// or https://");
            }
        }

        if self.platform.timeout_secs == 0 {
            anyhow::bail!("platform.timeout_secs must be greater than 0");
        }

        Ok(())
    }

    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.monitor.interval_secs)
    }

    #[must_use]
    pub fn endpoint_delay(&self) -> Duration {
        Duration::from_millis(self.monitor.endpoint_delay_ms)
    }

    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe.timeout_secs)
    }

    #[must_use]
    pub fn fallback_timeout(&self) -> Duration {
        Duration::from_secs(self.fallback.timeout_secs)
    }

    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    /// Webhook platform settings derived from this config
    pub fn webhook(&self) -> WebhookConfig {
        WebhookConfig::default()
            .with_timeout(self.platform.timeout_secs)
            .with_max_retries(self.platform.max_retries)
    }
}
