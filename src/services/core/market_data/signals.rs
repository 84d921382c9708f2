use crate::types::{
    LeverageStatus, LiquidationPressure, MarketSignals, MarketSnapshot, WhaleStatus,
};

/// Whale long/short ratio above which top traders count as accumulating.
pub const WHALE_ACCUMULATING_RATIO: f64 = 1.2;
/// Whale long/short ratio below which top traders count as distributing.
pub const WHALE_DISTRIBUTING_RATIO: f64 = 0.8;
/// Share of liquidated volume on one side that marks that side as squeezed.
pub const LIQUIDATION_SQUEEZE_SHARE: f64 = 0.6;
/// Funding (percent per interval) above which leverage is overheated.
pub const FUNDING_OVERHEATED: f64 = 0.05;
/// Funding (percent per interval) above which a high retail LSR marks longs crowded.
pub const FUNDING_LONG_CROWDED: f64 = 0.01;
pub const LONG_CROWDED_RATIO: f64 = 1.5;

impl MarketSignals {
    /// Classify a snapshot into leverage, whale and liquidation states.
    pub fn derive(snapshot: &MarketSnapshot) -> Self {
        Self {
            leverage_status: leverage_status(snapshot.funding_rate, snapshot.long_short_ratio),
            whale_status: whale_status(snapshot.whale_long_short_ratio),
            liquidation_pressure: liquidation_pressure(snapshot),
        }
    }
}

pub fn whale_status(whale_long_short_ratio: Option<f64>) -> WhaleStatus {
    match whale_long_short_ratio {
        Some(ratio) if ratio > WHALE_ACCUMULATING_RATIO => WhaleStatus::Accumulating,
        Some(ratio) if ratio < WHALE_DISTRIBUTING_RATIO => WhaleStatus::Distributing,
        _ => WhaleStatus::Watching,
    }
}

pub fn liquidation_pressure(snapshot: &MarketSnapshot) -> LiquidationPressure {
    let Some(liquidations) = &snapshot.liquidations else {
        return LiquidationPressure::Balanced;
    };
    match (liquidations.long_share(), liquidations.short_share()) {
        (Some(long), _) if long > LIQUIDATION_SQUEEZE_SHARE => LiquidationPressure::LongsSqueezed,
        (_, Some(short)) if short > LIQUIDATION_SQUEEZE_SHARE => LiquidationPressure::ShortsSqueezed,
        _ => LiquidationPressure::Balanced,
    }
}

pub fn leverage_status(funding_rate: f64, long_short_ratio: f64) -> LeverageStatus {
    if funding_rate > FUNDING_OVERHEATED {
        LeverageStatus::Overheated
    } else if funding_rate > FUNDING_LONG_CROWDED && long_short_ratio > LONG_CROWDED_RATIO {
        LeverageStatus::LongCrowded
    } else if funding_rate < 0.0 {
        LeverageStatus::ShortCrowded
    } else {
        LeverageStatus::Neutral
    }
}
