// src/services/mod.rs

// Core services organized by domain
pub mod core;

// Re-export commonly used services
pub use core::infrastructure::{CacheAside, CacheConfig, CacheServices, KvStoreAdapter};
pub use core::market_data::{detect_alerts, MarketAlertMonitor};
