//! market_pulse
//!
//! Core of the market analysis site: a stampede-safe cache-aside layer over a shared
//! KV store, and a threshold-based alert engine fed by cached market snapshots.

// Module declarations
pub mod services;
pub mod types;
pub mod utils;

pub mod test_utils;

pub use services::core::infrastructure::{
    CacheAside, CacheAsideOptions, CacheConfig, CacheServices, KvBackend, KvStoreAdapter,
};
pub use services::core::market_data::{
    detect_alerts, AlertBatch, AlertEvent, AlertSeverity, AlertType, MarketAlertMonitor,
};
pub use types::{MarketSignals, MarketSnapshot, MarketStateRecord};
pub use utils::{PulseError, PulseResult};
