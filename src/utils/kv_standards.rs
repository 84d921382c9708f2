//! KV Store Standardization Utilities
//!
//! Consistent patterns for KV store usage across the cache core:
//! - Semantic TTL tiers so callers pick "how fresh" instead of a raw number
//! - Standardized key naming conventions
//! - Lock key derivation

use serde::{Deserialize, Serialize};

/// Standard TTL tiers for cached data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheTTL {
    /// Tick-level market data (30 seconds)
    Realtime = 30,
    /// Fast-moving aggregates (1 minute)
    Fast = 60,
    /// Derived analysis, sentiment (5 minutes)
    Medium = 300,
    /// Slow-moving reference data (15 minutes)
    Slow = 900,
    /// Content and long-lived lookups (1 hour)
    Hourly = 3600,
}

impl CacheTTL {
    pub fn as_seconds(&self) -> u64 {
        *self as u64
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheTTL::Realtime => "realtime",
            CacheTTL::Fast => "fast",
            CacheTTL::Medium => "medium",
            CacheTTL::Slow => "slow",
            CacheTTL::Hourly => "hourly",
        }
    }

    pub fn from_name(name: &str) -> Option<CacheTTL> {
        match name.to_lowercase().as_str() {
            "realtime" => Some(CacheTTL::Realtime),
            "fast" => Some(CacheTTL::Fast),
            "medium" => Some(CacheTTL::Medium),
            "slow" => Some(CacheTTL::Slow),
            "hourly" => Some(CacheTTL::Hourly),
            _ => None,
        }
    }
}

/// Standard key prefixes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPrefix {
    MarketSnapshot,
    MarketState,
    AlertRateLimit,
    Lock,
    HealthCheck,
}

impl KeyPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyPrefix::MarketSnapshot => "market:snapshot",
            KeyPrefix::MarketState => "market:state",
            KeyPrefix::AlertRateLimit => "alert_rl",
            KeyPrefix::Lock => "lock",
            KeyPrefix::HealthCheck => "health_check",
        }
    }
}

/// Standardized KV key builder
#[derive(Debug, Clone)]
pub struct KvKeyBuilder {
    prefix: KeyPrefix,
    components: Vec<String>,
}

impl KvKeyBuilder {
    pub fn new(prefix: KeyPrefix) -> Self {
        Self {
            prefix,
            components: Vec::new(),
        }
    }

    pub fn add_component<T: ToString>(mut self, component: T) -> Self {
        self.components.push(component.to_string());
        self
    }

    pub fn build(self) -> String {
        let mut key = self.prefix.as_str().to_string();
        for component in self.components {
            key.push(':');
            key.push_str(&component);
        }
        key
    }
}

/// Key under which the recompute lock for `key` lives.
pub fn lock_key(key: &str) -> String {
    KvKeyBuilder::new(KeyPrefix::Lock).add_component(key).build()
}
