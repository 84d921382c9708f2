// src/types.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Liquidation totals over the snapshot window, in quote currency (USD).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiquidationSummary {
    pub total: f64,
    /// Liquidated long positions
    pub long: f64,
    /// Liquidated short positions
    pub short: f64,
}

impl LiquidationSummary {
    pub fn long_share(&self) -> Option<f64> {
        (self.total > 0.0).then(|| self.long / self.total)
    }

    pub fn short_share(&self) -> Option<f64> {
        (self.total > 0.0).then(|| self.short / self.total)
    }
}

/// Fresh market data for one symbol as returned by a market data source.
///
/// `funding_rate` is a percentage per funding interval: `0.01` means 0.01 %.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub symbol: String,
    pub price: f64,
    pub open_interest: f64,
    pub funding_rate: f64,
    /// Retail (all accounts) long/short ratio
    pub long_short_ratio: f64,
    /// Top-trader long/short ratio
    #[serde(default)]
    pub whale_long_short_ratio: Option<f64>,
    #[serde(default)]
    pub liquidations: Option<LiquidationSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidationPressure {
    LongsSqueezed,
    ShortsSqueezed,
    Balanced,
}

impl LiquidationPressure {
    pub fn as_str(&self) -> &'static str {
        match self {
            LiquidationPressure::LongsSqueezed => "longs_squeezed",
            LiquidationPressure::ShortsSqueezed => "shorts_squeezed",
            LiquidationPressure::Balanced => "balanced",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WhaleStatus {
    Accumulating,
    Distributing,
    Watching,
}

impl WhaleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WhaleStatus::Accumulating => "accumulating",
            WhaleStatus::Distributing => "distributing",
            WhaleStatus::Watching => "watching",
        }
    }

    /// Accumulating or distributing; `Watching` is the neutral state.
    pub fn is_directional(&self) -> bool {
        matches!(self, WhaleStatus::Accumulating | WhaleStatus::Distributing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeverageStatus {
    Overheated,
    LongCrowded,
    Neutral,
    ShortCrowded,
}

impl LeverageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeverageStatus::Overheated => "overheated",
            LeverageStatus::LongCrowded => "long_crowded",
            LeverageStatus::Neutral => "neutral",
            LeverageStatus::ShortCrowded => "short_crowded",
        }
    }
}

impl std::fmt::Display for LiquidationPressure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::fmt::Display for WhaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::fmt::Display for LeverageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Qualitative state derived from a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketSignals {
    pub leverage_status: LeverageStatus,
    pub whale_status: WhaleStatus,
    pub liquidation_pressure: LiquidationPressure,
}

impl Default for MarketSignals {
    fn default() -> Self {
        Self {
            leverage_status: LeverageStatus::Neutral,
            whale_status: WhaleStatus::Watching,
            liquidation_pressure: LiquidationPressure::Balanced,
        }
    }
}

/// Last persisted state of a market, compared against on the next tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStateRecord {
    pub symbol: String,
    pub price: f64,
    pub open_interest: f64,
    pub funding_rate: f64,
    pub long_short_ratio: f64,
    #[serde(default)]
    pub whale_long_short_ratio: Option<f64>,
    pub leverage_status: LeverageStatus,
    pub whale_status: WhaleStatus,
    pub liquidation_pressure: LiquidationPressure,
    pub updated_at: DateTime<Utc>,
}

impl MarketStateRecord {
    pub fn from_snapshot(snapshot: &MarketSnapshot, signals: &MarketSignals, updated_at: DateTime<Utc>) -> Self {
        Self {
            symbol: snapshot.symbol.clone(),
            price: snapshot.price,
            open_interest: snapshot.open_interest,
            funding_rate: snapshot.funding_rate,
            long_short_ratio: snapshot.long_short_ratio,
            whale_long_short_ratio: snapshot.whale_long_short_ratio,
            leverage_status: signals.leverage_status,
            whale_status: signals.whale_status,
            liquidation_pressure: signals.liquidation_pressure,
            updated_at,
        }
    }
}
