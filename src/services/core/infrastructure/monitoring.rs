// Cache Monitoring - store health snapshots and threshold warnings

use super::kv_backend::KvBackend;
use super::kv_store::{AdapterStats, KvStoreAdapter};
use crate::utils::kv_standards::{KeyPrefix, KvKeyBuilder};
use crate::utils::logger::Logger;
use crate::utils::time::now_utc;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Point-in-time view of the store. Every remote metric is optional: a missing
/// remote or an unreadable field leaves it `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreHealthSnapshot {
    pub remote_configured: bool,
    pub backend: Option<String>,
    pub used_memory_bytes: Option<u64>,
    pub max_memory_bytes: Option<u64>,
    pub memory_usage_ratio: Option<f64>,
    pub fragmentation_ratio: Option<f64>,
    pub evicted_keys: Option<u64>,
    pub hit_rate: Option<f64>,
    pub ops_per_sec: Option<u64>,
    pub connected_clients: Option<u64>,
    pub total_connections_received: Option<u64>,
    pub latency_ms: Option<f64>,
    pub adapter: AdapterStats,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorThresholds {
    pub max_memory_usage: f64,
    pub max_fragmentation: f64,
    pub min_hit_rate: f64,
}

impl Default for MonitorThresholds {
    fn default() -> Self {
        Self {
            max_memory_usage: 0.8,
            max_fragmentation: 1.5,
            min_hit_rate: 0.8,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthWarning {
    pub metric: String,
    pub value: f64,
    pub threshold: f64,
    pub message: String,
}

pub struct CacheMonitor {
    store: Arc<KvStoreAdapter>,
    thresholds: MonitorThresholds,
    logger: Logger,
}

fn parse_field<T: std::str::FromStr>(info: &HashMap<String, String>, field: &str) -> Option<T> {
    info.get(field).and_then(|raw| raw.trim().parse::<T>().ok())
}

impl CacheMonitor {
    pub fn new(store: Arc<KvStoreAdapter>) -> Self {
        Self::with_thresholds(store, MonitorThresholds::default())
    }

    pub fn with_thresholds(store: Arc<KvStoreAdapter>, thresholds: MonitorThresholds) -> Self {
        Self {
            store,
            thresholds,
            logger: Logger::for_component("cache_monitor"),
        }
    }

    /// Collect a snapshot. Never fails; unavailable metrics are left empty.
    pub async fn snapshot(&self) -> StoreHealthSnapshot {
        let mut snapshot = StoreHealthSnapshot {
            remote_configured: self.store.is_remote_configured(),
            backend: None,
            used_memory_bytes: None,
            max_memory_bytes: None,
            memory_usage_ratio: None,
            fragmentation_ratio: None,
            evicted_keys: None,
            hit_rate: None,
            ops_per_sec: None,
            connected_clients: None,
            total_connections_received: None,
            latency_ms: None,
            adapter: self.store.stats(),
            captured_at: now_utc(),
        };

        let Some(remote) = self.store.remote() else {
            return snapshot;
        };
        snapshot.backend = Some(remote.name().to_string());

        let ping_key = KvKeyBuilder::new(KeyPrefix::HealthCheck).add_component("ping").build();
        let started = Instant::now();
        match remote.exists(&ping_key).await {
            Ok(_) => snapshot.latency_ms = Some(started.elapsed().as_secs_f64() * 1000.0),
            Err(e) => self.logger.debug_with_meta(
                "Latency check failed",
                &serde_json::json!({ "error": e.to_string() }),
            ),
        }

        let info = match remote.info().await {
            Ok(info) => info,
            Err(e) => {
                self.logger.debug_with_meta(
                    "Store metrics unavailable",
                    &serde_json::json!({ "error": e.to_string() }),
                );
                return snapshot;
            }
        };

        snapshot.used_memory_bytes = parse_field(&info, "used_memory");
        // maxmemory 0 means unbounded
        snapshot.max_memory_bytes = parse_field::<u64>(&info, "maxmemory").filter(|max| *max > 0);
        if let (Some(used), Some(max)) = (snapshot.used_memory_bytes, snapshot.max_memory_bytes) {
            snapshot.memory_usage_ratio = Some(used as f64 / max as f64);
        }
        snapshot.fragmentation_ratio = parse_field(&info, "mem_fragmentation_ratio");
        snapshot.evicted_keys = parse_field(&info, "evicted_keys");
        snapshot.ops_per_sec = parse_field(&info, "instantaneous_ops_per_sec");
        snapshot.connected_clients = parse_field(&info, "connected_clients");
        snapshot.total_connections_received = parse_field(&info, "total_connections_received");

        let hits: Option<u64> = parse_field(&info, "keyspace_hits");
        let misses: Option<u64> = parse_field(&info, "keyspace_misses");
        if let (Some(hits), Some(misses)) = (hits, misses) {
            if hits + misses > 0 {
                snapshot.hit_rate = Some(hits as f64 / (hits + misses) as f64);
            }
        }

        snapshot
    }

    pub fn evaluate(&self, snapshot: &StoreHealthSnapshot) -> Vec<HealthWarning> {
        let mut warnings = Vec::new();

        if let Some(usage) = snapshot.memory_usage_ratio {
            if usage > self.thresholds.max_memory_usage {
                warnings.push(HealthWarning {
                    metric: "memory_usage".to_string(),
                    value: usage,
                    threshold: self.thresholds.max_memory_usage,
                    message: format!("Memory usage at {:.1}%", usage * 100.0),
                });
            }
        }

        if let Some(fragmentation) = snapshot.fragmentation_ratio {
            if fragmentation > self.thresholds.max_fragmentation {
                warnings.push(HealthWarning {
                    metric: "fragmentation".to_string(),
                    value: fragmentation,
                    threshold: self.thresholds.max_fragmentation,
                    message: format!("Memory fragmentation ratio {:.2}", fragmentation),
                });
            }
        }

        if let Some(hit_rate) = snapshot.hit_rate {
            if hit_rate < self.thresholds.min_hit_rate {
                warnings.push(HealthWarning {
                    metric: "hit_rate".to_string(),
                    value: hit_rate,
                    threshold: self.thresholds.min_hit_rate,
                    message: format!("Cache hit rate at {:.1}%", hit_rate * 100.0),
                });
            }
        }

        warnings
    }

    /// Snapshot, evaluate and log. Returns the warnings raised.
    pub async fn check(&self) -> Vec<HealthWarning> {
        let snapshot = self.snapshot().await;
        let warnings = self.evaluate(&snapshot);

        for warning in &warnings {
            self.logger.warn_with_meta(
                &warning.message,
                &serde_json::json!({
                    "metric": warning.metric,
                    "value": warning.value,
                    "threshold": warning.threshold,
                }),
            );
        }

        if let Ok(meta) = serde_json::to_value(&snapshot) {
            self.logger.debug_with_meta("Cache health snapshot", &meta);
        }
        warnings
    }

    pub fn spawn_periodic(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                self.check().await;
            }
        })
    }
}
