// src/test_utils/mod.rs

pub mod mock_kv_store;

pub use mock_kv_store::MockKvBackend;

use crate::types::{LiquidationSummary, MarketSnapshot};

// Add test utility functions
pub fn create_test_snapshot(symbol: &str, price: f64, open_interest: f64, funding_rate: f64) -> MarketSnapshot {
    MarketSnapshot {
        symbol: symbol.to_string(),
        price,
        open_interest,
        funding_rate,
        long_short_ratio: 1.0,
        whale_long_short_ratio: None,
        liquidations: None,
    }
}

pub fn create_test_liquidations(long: f64, short: f64) -> LiquidationSummary {
    LiquidationSummary {
        total: long + short,
        long,
        short,
    }
}
