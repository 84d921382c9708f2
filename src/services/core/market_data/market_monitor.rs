// Market Alert Monitor - periodic snapshot -> signals -> alerts -> dispatch pipeline

use crate::services::core::infrastructure::cache_aside::{CacheAside, CacheAsideOptions};
use crate::services::core::infrastructure::kv_store::KvStoreAdapter;
use crate::services::core::market_data::alert_engine::{detect_alerts, AlertBatch};
use crate::services::core::market_data::alert_rate_limiter::{AlertCooldowns, AlertRateLimiter};
use crate::types::{MarketSignals, MarketSnapshot, MarketStateRecord};
use crate::utils::error::{PulseError, PulseResult};
use crate::utils::kv_standards::{CacheTTL, KeyPrefix, KvKeyBuilder};
use crate::utils::logger::Logger;
use crate::utils::time::now_utc;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Supplies fresh market data. Vendor specifics live behind this trait.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_snapshot(&self, symbol: &str) -> PulseResult<MarketSnapshot>;
}

/// Persists the last known state per market.
#[async_trait]
pub trait MarketStateStore: Send + Sync {
    async fn load(&self, symbol: &str) -> PulseResult<Option<MarketStateRecord>>;
    async fn save(&self, record: &MarketStateRecord) -> PulseResult<()>;
}

/// Receives alert batches (notification fan-out, log sink, ...).
#[async_trait]
pub trait AlertDispatcher: Send + Sync {
    async fn dispatch(&self, batch: &AlertBatch) -> PulseResult<()>;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketMonitorConfig {
    pub symbols: Vec<String>,
    pub snapshot_ttl: CacheTTL,
    pub tick_interval_seconds: u64,
    pub rate_limit_enabled: bool,
    pub cooldowns: AlertCooldowns,
}

impl Default for MarketMonitorConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["BTCUSDT".to_string(), "ETHUSDT".to_string()],
            snapshot_ttl: CacheTTL::Realtime,
            tick_interval_seconds: 60,
            rate_limit_enabled: true,
            cooldowns: AlertCooldowns::default(),
        }
    }
}

impl MarketMonitorConfig {
    pub fn validate(&self) -> PulseResult<()> {
        if self.symbols.is_empty() {
            return Err(PulseError::config_error("market monitor needs at least one symbol"));
        }
        if self.tick_interval_seconds == 0 {
            return Err(PulseError::config_error("market monitor tick interval must be positive"));
        }
        Ok(())
    }
}

/// Outcome of ticking every configured market once.
#[derive(Debug, Clone, Default)]
pub struct MonitorRunReport {
    pub batches: Vec<AlertBatch>,
    pub failed: Vec<String>,
}

impl MonitorRunReport {
    pub fn alert_count(&self) -> usize {
        self.batches.iter().map(|b| b.alerts.len()).sum()
    }
}

pub struct MarketAlertMonitor {
    config: MarketMonitorConfig,
    cache: CacheAside,
    source: Arc<dyn MarketDataSource>,
    state_store: Arc<dyn MarketStateStore>,
    dispatcher: Arc<dyn AlertDispatcher>,
    rate_limiter: Option<AlertRateLimiter>,
    logger: Logger,
}

impl MarketAlertMonitor {
    pub fn new(
        config: MarketMonitorConfig,
        cache: CacheAside,
        source: Arc<dyn MarketDataSource>,
        state_store: Arc<dyn MarketStateStore>,
        dispatcher: Arc<dyn AlertDispatcher>,
    ) -> PulseResult<Self> {
        config.validate()?;
        let rate_limiter = config
            .rate_limit_enabled
            .then(|| AlertRateLimiter::new(cache.store().clone(), config.cooldowns.clone()));

        Ok(Self {
            config,
            cache,
            source,
            state_store,
            dispatcher,
            rate_limiter,
            logger: Logger::for_component("market_monitor"),
        })
    }

    pub fn config(&self) -> &MarketMonitorConfig {
        &self.config
    }

    pub fn snapshot_key(symbol: &str) -> String {
        KvKeyBuilder::new(KeyPrefix::MarketSnapshot)
            .add_component(symbol)
            .build()
    }

    /// Run the pipeline for one market and return the dispatched batch.
    ///
    /// A degraded cache read (no snapshot available) ends the tick with an empty batch
    /// and leaves the stored state untouched.
    pub async fn run_tick(&self, symbol: &str) -> PulseResult<AlertBatch> {
        let source = self.source.clone();
        let owned_symbol = symbol.to_string();
        let snapshot = self
            .cache
            .get_or_compute(
                &Self::snapshot_key(symbol),
                self.config.snapshot_ttl.as_seconds(),
                move || async move { source.fetch_snapshot(&owned_symbol).await },
                CacheAsideOptions::new(),
            )
            .await?;

        let Some(snapshot) = snapshot else {
            self.logger.warn_with_meta(
                "No market snapshot available, skipping tick",
                &serde_json::json!({ "symbol": symbol }),
            );
            return Ok(AlertBatch::new(symbol, Vec::new()));
        };

        let previous = self.state_store.load(symbol).await?;
        let signals = MarketSignals::derive(&snapshot);
        let mut alerts = detect_alerts(&snapshot, &signals, previous.as_ref());

        if let Some(limiter) = &self.rate_limiter {
            let detected = alerts.len();
            alerts = limiter.filter(alerts).await;
            if alerts.len() < detected {
                self.logger.debug_with_meta(
                    "Rate limited alerts",
                    &serde_json::json!({ "symbol": symbol, "suppressed": detected - alerts.len() }),
                );
            }
        }

        let batch = AlertBatch::new(symbol, alerts);
        if !batch.is_empty() {
            if let Err(e) = self.dispatcher.dispatch(&batch).await {
                // Undelivered alerts must be re-detectable on the next tick
                if let Some(limiter) = &self.rate_limiter {
                    limiter.release(&batch.alerts).await;
                }
                return Err(e);
            }
        }

        let record = MarketStateRecord::from_snapshot(&snapshot, &signals, now_utc());
        self.state_store.save(&record).await?;

        Ok(batch)
    }

    /// Tick every configured market; one market failing does not stop the others.
    pub async fn run_all(&self) -> MonitorRunReport {
        let mut report = MonitorRunReport::default();
        for symbol in &self.config.symbols {
            match self.run_tick(symbol).await {
                Ok(batch) => report.batches.push(batch),
                Err(e) => {
                    self.logger.error_with_error(
                        "Market tick failed",
                        &e,
                        Some(&serde_json::json!({ "symbol": symbol })),
                    );
                    report.failed.push(symbol.clone());
                }
            }
        }

        self.logger.info_with_meta(
            "Market tick complete",
            &serde_json::json!({
                "markets": self.config.symbols.len(),
                "failed": report.failed.len(),
                "alerts": report.alert_count(),
            }),
        );
        report
    }

    pub fn spawn_periodic(self: Arc<Self>) -> JoinHandle<()> {
        let interval = Duration::from_secs(self.config.tick_interval_seconds);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                self.run_all().await;
            }
        })
    }
}

/// Process-local state store.
#[derive(Debug, Default)]
pub struct InMemoryMarketStateStore {
    records: Mutex<HashMap<String, MarketStateRecord>>,
}

impl InMemoryMarketStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MarketStateStore for InMemoryMarketStateStore {
    async fn load(&self, symbol: &str) -> PulseResult<Option<MarketStateRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|e| PulseError::internal_error(format!("state store poisoned: {}", e)))?;
        Ok(records.get(symbol).cloned())
    }

    async fn save(&self, record: &MarketStateRecord) -> PulseResult<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|e| PulseError::internal_error(format!("state store poisoned: {}", e)))?;
        records.insert(record.symbol.clone(), record.clone());
        Ok(())
    }
}

/// State store kept in the shared KV store under `market:state:<symbol>`, without expiry.
pub struct KvMarketStateStore {
    store: Arc<KvStoreAdapter>,
}

impl KvMarketStateStore {
    pub fn new(store: Arc<KvStoreAdapter>) -> Self {
        Self { store }
    }

    fn key(symbol: &str) -> String {
        KvKeyBuilder::new(KeyPrefix::MarketState)
            .add_component(symbol)
            .build()
    }
}

#[async_trait]
impl MarketStateStore for KvMarketStateStore {
    async fn load(&self, symbol: &str) -> PulseResult<Option<MarketStateRecord>> {
        Ok(self.store.get_json(&Self::key(symbol)).await)
    }

    async fn save(&self, record: &MarketStateRecord) -> PulseResult<()> {
        self.store.set_json(&Self::key(&record.symbol), record, 0).await?;
        Ok(())
    }
}

/// Dispatcher that writes each alert to the structured log.
pub struct LoggingAlertDispatcher {
    logger: Logger,
}

impl Default for LoggingAlertDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl LoggingAlertDispatcher {
    pub fn new() -> Self {
        Self {
            logger: Logger::for_component("alert_dispatcher"),
        }
    }
}

#[async_trait]
impl AlertDispatcher for LoggingAlertDispatcher {
    async fn dispatch(&self, batch: &AlertBatch) -> PulseResult<()> {
        for alert in &batch.alerts {
            self.logger.info_with_meta(
                &alert.summary,
                &serde_json::json!({
                    "batch_id": batch.batch_id.to_string(),
                    "market": alert.market,
                    "alert_type": alert.alert_type.as_str(),
                    "severity": alert.severity.as_str(),
                    "metrics": alert.metrics,
                }),
            );
        }
        Ok(())
    }
}
