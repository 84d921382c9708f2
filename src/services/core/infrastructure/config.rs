//! Cache Configuration
//!
//! Runtime configuration for the cache core, loaded from the environment with
//! sane defaults for every knob.

use crate::utils::error::{PulseError, PulseResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Deployment environment, from `APP_ENV`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    #[default]
    Development,
    Test,
    Production,
}

impl Environment {
    pub fn from_name(name: &str) -> Environment {
        match name.trim().to_lowercase().as_str() {
            "production" | "prod" => Environment::Production,
            "test" | "testing" => Environment::Test,
            _ => Environment::Development,
        }
    }
}

/// Bounds and thresholds for access-frequency based TTL adjustment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdaptiveTtlConfig {
    pub min_ttl: u64,
    pub max_ttl: u64,
    /// Accesses per hour above which a key counts as hot
    pub hot_threshold: f64,
    /// Accesses per hour below which a key counts as cold
    pub cold_threshold: f64,
    pub stale_after_hours: u64,
    pub sweep_interval_seconds: u64,
}

impl Default for AdaptiveTtlConfig {
    fn default() -> Self {
        Self {
            min_ttl: 30,
            max_ttl: 3600,
            hot_threshold: 100.0,
            cold_threshold: 10.0,
            stale_after_hours: 24,
            sweep_interval_seconds: 3600,
        }
    }
}

impl AdaptiveTtlConfig {
    pub fn validate(&self) -> PulseResult<()> {
        if self.min_ttl == 0 || self.min_ttl > self.max_ttl {
            return Err(PulseError::config_error(format!(
                "adaptive TTL bounds invalid: min {} max {}",
                self.min_ttl, self.max_ttl
            )));
        }
        if self.cold_threshold < 0.0 || self.cold_threshold > self.hot_threshold {
            return Err(PulseError::config_error(format!(
                "adaptive TTL thresholds invalid: cold {} hot {}",
                self.cold_threshold, self.hot_threshold
            )));
        }
        if self.sweep_interval_seconds == 0 {
            return Err(PulseError::config_error(
                "adaptive TTL sweep interval must be positive",
            ));
        }
        Ok(())
    }
}

/// Cache core configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Remote KV connection string; `None` runs local-only
    pub redis_url: Option<String>,
    pub environment: Environment,
    pub connect_timeout_ms: u64,
    pub operation_timeout_ms: u64,
    /// Pause between remote connection attempts while the store is unreachable
    pub reconnect_backoff_ms: u64,
    pub lock_ttl_seconds: u64,
    pub lock_wait_ms: u64,
    pub adaptive_ttl: AdaptiveTtlConfig,
    pub monitor_interval_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            environment: Environment::Development,
            connect_timeout_ms: 2000,
            operation_timeout_ms: 500,
            reconnect_backoff_ms: 5000,
            lock_ttl_seconds: 10,
            lock_wait_ms: 100,
            adaptive_ttl: AdaptiveTtlConfig::default(),
            monitor_interval_seconds: 300,
        }
    }
}

impl CacheConfig {
    /// Defaults overridden by `REDIS_URL` and `APP_ENV`.
    pub fn from_env() -> Self {
        let redis_url = std::env::var("REDIS_URL")
            .ok()
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());
        let environment = std::env::var("APP_ENV")
            .map(|name| Environment::from_name(&name))
            .unwrap_or_default();

        Self {
            redis_url,
            environment,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> PulseResult<()> {
        if self.connect_timeout_ms == 0 || self.operation_timeout_ms == 0 {
            return Err(PulseError::config_error("KV timeouts must be positive"));
        }
        if self.lock_ttl_seconds == 0 {
            return Err(PulseError::config_error("lock TTL must be positive"));
        }
        if self.monitor_interval_seconds == 0 {
            return Err(PulseError::config_error(
                "monitor interval must be positive",
            ));
        }
        if let Some(url) = &self.redis_url {
            if !(url.starts_with("redis://")
                || url.starts_with("rediss://")
                || url.starts_with("redis+unix://")
                || url.starts_with("unix://"))
            {
                return Err(PulseError::config_error(format!(
                    "unsupported KV url scheme: {}",
                    url
                )));
            }
        }
        self.adaptive_ttl.validate()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }

    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms)
    }

    pub fn lock_wait(&self) -> Duration {
        Duration::from_millis(self.lock_wait_ms)
    }
}
