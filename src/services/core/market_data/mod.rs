// src/services/core/market_data/mod.rs

//! Market data alerting: signal derivation, threshold alert rules, per-type rate
//! limiting and the periodic monitor that ties them to the cache.

pub mod alert_engine;
pub mod alert_rate_limiter;
pub mod market_monitor;
pub mod signals;

pub use alert_engine::{detect_alerts, AlertBatch, AlertEvent, AlertSeverity, AlertType};
pub use alert_rate_limiter::{AlertCooldowns, AlertRateLimiter};
pub use market_monitor::{
    AlertDispatcher, InMemoryMarketStateStore, KvMarketStateStore, LoggingAlertDispatcher,
    MarketAlertMonitor, MarketDataSource, MarketMonitorConfig, MarketStateStore, MonitorRunReport,
};
