// Adaptive TTL Estimator - stretches TTLs for hot keys and shrinks them for cold ones

use super::config::AdaptiveTtlConfig;
use crate::utils::logger::Logger;
use crate::utils::time::{hours_between, now_utc};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

const HOT_MULTIPLIER: f64 = 1.5;
const COLD_MULTIPLIER: f64 = 0.7;

/// Clamp range and hot/cold thresholds (accesses per hour).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TtlBounds {
    pub min_ttl: u64,
    pub max_ttl: u64,
    pub hot_threshold: f64,
    pub cold_threshold: f64,
}

impl From<&AdaptiveTtlConfig> for TtlBounds {
    fn from(config: &AdaptiveTtlConfig) -> Self {
        Self {
            min_ttl: config.min_ttl,
            max_ttl: config.max_ttl,
            hot_threshold: config.hot_threshold,
            cold_threshold: config.cold_threshold,
        }
    }
}

impl Default for TtlBounds {
    fn default() -> Self {
        Self::from(&AdaptiveTtlConfig::default())
    }
}

/// Per-key access statistics, local to this process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccessStat {
    pub key: String,
    pub count: u64,
    pub first_access: DateTime<Utc>,
    pub last_access: DateTime<Utc>,
}

impl AccessStat {
    fn new(key: &str, now: DateTime<Utc>) -> Self {
        Self {
            key: key.to_string(),
            count: 0,
            first_access: now,
            last_access: now,
        }
    }

    /// Access rate, with the observation window floored at one hour.
    pub fn accesses_per_hour(&self, now: DateTime<Utc>) -> f64 {
        let hours = hours_between(self.first_access, now).max(1.0);
        self.count as f64 / hours
    }
}

pub struct AdaptiveTtlEstimator {
    stats: Mutex<HashMap<String, AccessStat>>,
    stale_after: chrono::Duration,
    logger: Logger,
}

impl AdaptiveTtlEstimator {
    pub fn new(stale_after_hours: u64) -> Self {
        Self {
            stats: Mutex::new(HashMap::new()),
            stale_after: chrono::Duration::hours(stale_after_hours as i64),
            logger: Logger::for_component("adaptive_ttl"),
        }
    }

    /// Record an access and return the adjusted TTL in one step.
    pub fn compute_ttl(&self, key: &str, base_ttl: u64, bounds: &TtlBounds) -> u64 {
        self.compute_ttl_at(key, base_ttl, bounds, now_utc())
    }

    pub fn compute_ttl_at(
        &self,
        key: &str,
        base_ttl: u64,
        bounds: &TtlBounds,
        now: DateTime<Utc>,
    ) -> u64 {
        self.record_access_at(key, now);
        self.adjusted_ttl_at(key, base_ttl, bounds, now)
    }

    pub fn record_access(&self, key: &str) {
        self.record_access_at(key, now_utc());
    }

    pub fn record_access_at(&self, key: &str, now: DateTime<Utc>) {
        let Ok(mut stats) = self.stats.lock() else {
            return;
        };
        let stat = stats
            .entry(key.to_string())
            .or_insert_with(|| AccessStat::new(key, now));
        stat.count += 1;
        stat.last_access = now;
    }

    /// TTL for `key` given its recorded access rate. Unknown keys keep `base_ttl`.
    pub fn adjusted_ttl(&self, key: &str, base_ttl: u64, bounds: &TtlBounds) -> u64 {
        self.adjusted_ttl_at(key, base_ttl, bounds, now_utc())
    }

    pub fn adjusted_ttl_at(
        &self,
        key: &str,
        base_ttl: u64,
        bounds: &TtlBounds,
        now: DateTime<Utc>,
    ) -> u64 {
        let rate = match self.stats.lock() {
            Ok(stats) => match stats.get(key) {
                Some(stat) => stat.accesses_per_hour(now),
                None => return base_ttl,
            },
            Err(_) => return base_ttl,
        };

        if rate > bounds.hot_threshold {
            ((base_ttl as f64 * HOT_MULTIPLIER).round() as u64).min(bounds.max_ttl)
        } else if rate < bounds.cold_threshold {
            ((base_ttl as f64 * COLD_MULTIPLIER).round() as u64).max(bounds.min_ttl)
        } else {
            base_ttl
        }
    }

    pub fn stat(&self, key: &str) -> Option<AccessStat> {
        self.stats.lock().ok()?.get(key).cloned()
    }

    pub fn tracked_keys(&self) -> usize {
        self.stats.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Drop stats not touched within the staleness window. Returns how many were removed.
    pub fn sweep_stale(&self) -> usize {
        self.sweep_stale_at(now_utc())
    }

    pub fn sweep_stale_at(&self, now: DateTime<Utc>) -> usize {
        let Ok(mut stats) = self.stats.lock() else {
            return 0;
        };
        let cutoff = now - self.stale_after;
        let before = stats.len();
        stats.retain(|_, stat| stat.last_access >= cutoff);
        before - stats.len()
    }

    /// Run [`sweep_stale`](Self::sweep_stale) every `interval` until the handle is aborted.
    pub fn spawn_sweeper(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = self.sweep_stale();
                if removed > 0 {
                    self.logger.debug_with_meta(
                        "Swept stale access statistics",
                        &serde_json::json!({ "removed": removed, "remaining": self.tracked_keys() }),
                    );
                }
            }
        })
    }
}

impl Default for AdaptiveTtlEstimator {
    fn default() -> Self {
        Self::new(AdaptiveTtlConfig::default().stale_after_hours)
    }
}
