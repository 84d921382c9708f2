// Market Alert Engine - threshold rules comparing the current tick against the last persisted state

use crate::types::{LiquidationPressure, MarketSignals, MarketSnapshot, MarketStateRecord};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

// Fixed policy thresholds
pub const PRICE_MOVE_THRESHOLD: f64 = 0.015;
pub const FLAT_PRICE_THRESHOLD: f64 = 0.005;
pub const VOLATILITY_OI_THRESHOLD: f64 = 0.03;
pub const HEAVY_LIQUIDATION_TOTAL: f64 = 30_000_000.0;
pub const HEAVY_LIQUIDATION_SHARE: f64 = 0.7;
pub const OI_SPIKE_THRESHOLD: f64 = 0.05;
/// Funding, in percent per interval
pub const FUNDING_HIGH_THRESHOLD: f64 = 0.05;
pub const DIVERGENCE_BULLISH_RATIO: f64 = 1.2;
pub const DIVERGENCE_BEARISH_RATIO: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    PriceDrop,
    PricePump,
    VolatilityWarning,
    HeavyDump,
    HeavyPump,
    LiquidationFlip,
    OiSpike,
    FundingFlipNeg,
    FundingHigh,
    WhaleShift,
    WhaleDivergence,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::PriceDrop => "price_drop",
            AlertType::PricePump => "price_pump",
            AlertType::VolatilityWarning => "volatility_warning",
            AlertType::HeavyDump => "heavy_dump",
            AlertType::HeavyPump => "heavy_pump",
            AlertType::LiquidationFlip => "liquidation_flip",
            AlertType::OiSpike => "oi_spike",
            AlertType::FundingFlipNeg => "funding_flip_neg",
            AlertType::FundingHigh => "funding_high",
            AlertType::WhaleShift => "whale_shift",
            AlertType::WhaleDivergence => "whale_divergence",
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
}

impl AlertSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Low => "low",
            AlertSeverity::Medium => "medium",
            AlertSeverity::High => "high",
        }
    }
}

/// One triggered rule. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub alert_type: AlertType,
    pub market: String,
    pub severity: AlertSeverity,
    pub summary: String,
    pub metrics: HashMap<String, Value>,
}

impl AlertEvent {
    fn new(
        alert_type: AlertType,
        market: &str,
        severity: AlertSeverity,
        summary: String,
        metrics: Value,
    ) -> Self {
        let metrics = match metrics {
            Value::Object(map) => map.into_iter().collect(),
            _ => HashMap::new(),
        };
        Self {
            alert_type,
            market: market.to_string(),
            severity,
            summary,
            metrics,
        }
    }
}

/// All alerts produced for one market in one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertBatch {
    pub batch_id: Uuid,
    pub market: String,
    pub generated_at: DateTime<Utc>,
    pub alerts: Vec<AlertEvent>,
}

impl AlertBatch {
    pub fn new(market: &str, alerts: Vec<AlertEvent>) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            market: market.to_string(),
            generated_at: Utc::now(),
            alerts,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.alerts.is_empty()
    }

    pub fn highest_severity(&self) -> Option<AlertSeverity> {
        self.alerts.iter().map(|a| a.severity).max()
    }
}

/// Relative change against `base`; `None` when the base is zero.
fn relative_change(current: f64, base: f64) -> Option<f64> {
    (base != 0.0).then(|| (current - base) / base)
}

fn pct(ratio: f64) -> String {
    format!("{:.2}%", ratio * 100.0)
}

/// Compare the current tick against the previous state and return every rule that fires.
///
/// Returns nothing on cold start (`previous == None`). Alerts are not deduplicated
/// across calls, and `oi_spike` may fire together with `volatility_warning`.
pub fn detect_alerts(
    current: &MarketSnapshot,
    signals: &MarketSignals,
    previous: Option<&MarketStateRecord>,
) -> Vec<AlertEvent> {
    let Some(previous) = previous else {
        return Vec::new();
    };

    let market = current.symbol.as_str();
    let mut alerts = Vec::new();

    let price_change = relative_change(current.price, previous.price);
    let oi_change = relative_change(current.open_interest, previous.open_interest);

    if let Some(change) = price_change {
        if change <= -PRICE_MOVE_THRESHOLD {
            alerts.push(AlertEvent::new(
                AlertType::PriceDrop,
                market,
                AlertSeverity::High,
                format!("{} dropped {} since last check", market, pct(change.abs())),
                serde_json::json!({
                    "price_change": change,
                    "price": current.price,
                    "previous_price": previous.price,
                }),
            ));
        } else if change >= PRICE_MOVE_THRESHOLD {
            alerts.push(AlertEvent::new(
                AlertType::PricePump,
                market,
                AlertSeverity::High,
                format!("{} pumped {} since last check", market, pct(change)),
                serde_json::json!({
                    "price_change": change,
                    "price": current.price,
                    "previous_price": previous.price,
                }),
            ));
        }
    }

    if let (Some(price), Some(oi)) = (price_change, oi_change) {
        if price.abs() < FLAT_PRICE_THRESHOLD && oi.abs() > VOLATILITY_OI_THRESHOLD {
            alerts.push(AlertEvent::new(
                AlertType::VolatilityWarning,
                market,
                AlertSeverity::Medium,
                format!(
                    "{} price flat while open interest moved {}; expect volatility",
                    market,
                    pct(oi)
                ),
                serde_json::json!({ "price_change": price, "oi_change": oi }),
            ));
        }
    }

    if let Some(liquidations) = &current.liquidations {
        if liquidations.total > HEAVY_LIQUIDATION_TOTAL {
            let long_share = liquidations.long_share().unwrap_or(0.0);
            let short_share = liquidations.short_share().unwrap_or(0.0);
            let metrics = serde_json::json!({
                "total": liquidations.total,
                "long": liquidations.long,
                "short": liquidations.short,
                "long_share": long_share,
                "short_share": short_share,
            });
            if long_share > HEAVY_LIQUIDATION_SHARE {
                alerts.push(AlertEvent::new(
                    AlertType::HeavyDump,
                    market,
                    AlertSeverity::High,
                    format!(
                        "{} heavy long liquidations: ${:.1}M, {} longs",
                        market,
                        liquidations.total / 1_000_000.0,
                        pct(long_share)
                    ),
                    metrics,
                ));
            } else if short_share > HEAVY_LIQUIDATION_SHARE {
                alerts.push(AlertEvent::new(
                    AlertType::HeavyPump,
                    market,
                    AlertSeverity::High,
                    format!(
                        "{} heavy short liquidations: ${:.1}M, {} shorts",
                        market,
                        liquidations.total / 1_000_000.0,
                        pct(short_share)
                    ),
                    metrics,
                ));
            }
        }
    }

    if previous.liquidation_pressure != signals.liquidation_pressure
        && previous.liquidation_pressure != LiquidationPressure::Balanced
        && signals.liquidation_pressure != LiquidationPressure::Balanced
    {
        alerts.push(AlertEvent::new(
            AlertType::LiquidationFlip,
            market,
            AlertSeverity::Medium,
            format!(
                "{} liquidation pressure flipped from {} to {}",
                market, previous.liquidation_pressure, signals.liquidation_pressure
            ),
            serde_json::json!({
                "previous": previous.liquidation_pressure,
                "current": signals.liquidation_pressure,
            }),
        ));
    }

    if let Some(oi) = oi_change {
        if oi > OI_SPIKE_THRESHOLD {
            alerts.push(AlertEvent::new(
                AlertType::OiSpike,
                market,
                AlertSeverity::Medium,
                format!("{} open interest up {}", market, pct(oi)),
                serde_json::json!({
                    "oi_change": oi,
                    "open_interest": current.open_interest,
                    "previous_open_interest": previous.open_interest,
                }),
            ));
        }
    }

    if previous.funding_rate > 0.0 && current.funding_rate < 0.0 {
        alerts.push(AlertEvent::new(
            AlertType::FundingFlipNeg,
            market,
            AlertSeverity::Medium,
            format!(
                "{} funding turned negative ({:.4}% -> {:.4}%)",
                market, previous.funding_rate, current.funding_rate
            ),
            serde_json::json!({
                "funding_rate": current.funding_rate,
                "previous_funding_rate": previous.funding_rate,
            }),
        ));
    }

    if current.funding_rate > FUNDING_HIGH_THRESHOLD && current.funding_rate > previous.funding_rate {
        alerts.push(AlertEvent::new(
            AlertType::FundingHigh,
            market,
            AlertSeverity::High,
            format!(
                "{} funding elevated and rising at {:.4}%",
                market, current.funding_rate
            ),
            serde_json::json!({
                "funding_rate": current.funding_rate,
                "previous_funding_rate": previous.funding_rate,
            }),
        ));
    }

    if previous.whale_status != signals.whale_status
        && (previous.whale_status.is_directional() || signals.whale_status.is_directional())
    {
        alerts.push(AlertEvent::new(
            AlertType::WhaleShift,
            market,
            AlertSeverity::High,
            format!(
                "{} whales shifted from {} to {}",
                market, previous.whale_status, signals.whale_status
            ),
            serde_json::json!({
                "previous": previous.whale_status,
                "current": signals.whale_status,
                "whale_long_short_ratio": current.whale_long_short_ratio,
            }),
        ));
    }

    if let Some(whale) = current.whale_long_short_ratio {
        let retail = current.long_short_ratio;
        let summary = if retail > DIVERGENCE_BULLISH_RATIO && whale < DIVERGENCE_BEARISH_RATIO {
            Some(format!(
                "{} retail is long ({:.2}) while whales are short ({:.2})",
                market, retail, whale
            ))
        } else if retail < DIVERGENCE_BEARISH_RATIO && whale > DIVERGENCE_BULLISH_RATIO {
            Some(format!(
                "{} retail is short ({:.2}) while whales are long ({:.2})",
                market, retail, whale
            ))
        } else {
            None
        };
        if let Some(summary) = summary {
            alerts.push(AlertEvent::new(
                AlertType::WhaleDivergence,
                market,
                AlertSeverity::High,
                summary,
                serde_json::json!({
                    "long_short_ratio": retail,
                    "whale_long_short_ratio": whale,
                }),
            ));
        }
    }

    alerts
}
