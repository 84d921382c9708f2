// Alert Engine Unit Tests
// Threshold boundaries and rule combinations for detect_alerts

use chrono::Utc;
use market_pulse::test_utils::{create_test_liquidations, create_test_snapshot};
use market_pulse::types::{LiquidationPressure, WhaleStatus};
use market_pulse::{
    detect_alerts, AlertBatch, AlertEvent, AlertSeverity, AlertType, MarketSignals, MarketSnapshot,
    MarketStateRecord,
};

fn state_of(snapshot: &MarketSnapshot) -> MarketStateRecord {
    MarketStateRecord::from_snapshot(snapshot, &MarketSignals::derive(snapshot), Utc::now())
}

fn alerts_between(previous: &MarketSnapshot, current: &MarketSnapshot) -> Vec<AlertEvent> {
    let prev = state_of(previous);
    detect_alerts(current, &MarketSignals::derive(current), Some(&prev))
}

fn types_of(alerts: &[AlertEvent]) -> Vec<AlertType> {
    alerts.iter().map(|a| a.alert_type).collect()
}

#[test]
fn test_cold_start_emits_nothing() {
    let mut current = create_test_snapshot("BTCUSDT", 50000.0, 1e9, 0.2);
    current.liquidations = Some(create_test_liquidations(50_000_000.0, 1_000_000.0));
    current.whale_long_short_ratio = Some(0.5);
    current.long_short_ratio = 2.0;

    assert!(detect_alerts(&current, &MarketSignals::derive(&current), None).is_empty());
}

#[test]
fn test_price_drop_fires_at_exact_threshold() {
    let prev = create_test_snapshot("BTCUSDT", 100000.0, 1e9, 0.01);

    let at = alerts_between(&prev, &create_test_snapshot("BTCUSDT", 98500.0, 1e9, 0.01));
    assert_eq!(types_of(&at), vec![AlertType::PriceDrop]);

    let inside = alerts_between(&prev, &create_test_snapshot("BTCUSDT", 98510.0, 1e9, 0.01));
    assert!(inside.is_empty());
}

#[test]
fn test_price_pump_fires_at_exact_threshold() {
    let prev = create_test_snapshot("BTCUSDT", 100000.0, 1e9, 0.01);

    let at = alerts_between(&prev, &create_test_snapshot("BTCUSDT", 101500.0, 1e9, 0.01));
    assert_eq!(types_of(&at), vec![AlertType::PricePump]);

    let inside = alerts_between(&prev, &create_test_snapshot("BTCUSDT", 101490.0, 1e9, 0.01));
    assert!(inside.is_empty());
}

#[test]
fn test_price_crash_without_liquidations() {
    let prev = create_test_snapshot("BTCUSDT", 90000.0, 1e9, 0.01);
    let mut current = create_test_snapshot("BTCUSDT", 88000.0, 1e9, 0.01);
    current.liquidations = Some(create_test_liquidations(0.0, 0.0));

    let alerts = alerts_between(&prev, &current);
    assert_eq!(alerts.len(), 1);
    let drop = &alerts[0];
    assert_eq!(drop.alert_type, AlertType::PriceDrop);
    assert_eq!(drop.severity, AlertSeverity::High);
    assert_eq!(drop.market, "BTCUSDT");
    assert!(drop.summary.contains("2.22%"));
    let change = drop.metrics["price_change"].as_f64().unwrap();
    assert!((change + 0.0222).abs() < 1e-3);
}

#[test]
fn test_heavy_long_liquidations_flag_dump() {
    let prev = create_test_snapshot("ETHUSDT", 3000.0, 5e8, 0.01);
    let mut current = create_test_snapshot("ETHUSDT", 2990.0, 5e8, 0.01);
    current.liquidations = Some(create_test_liquidations(35_000_000.0, 5_000_000.0));

    let alerts = alerts_between(&prev, &current);
    assert_eq!(types_of(&alerts), vec![AlertType::HeavyDump]);
    assert_eq!(alerts[0].severity, AlertSeverity::High);
    assert_eq!(alerts[0].metrics["total"].as_f64(), Some(40_000_000.0));
}

#[test]
fn test_heavy_short_liquidations_flag_pump() {
    let prev = create_test_snapshot("ETHUSDT", 3000.0, 5e8, 0.01);
    let mut current = create_test_snapshot("ETHUSDT", 3010.0, 5e8, 0.01);
    current.liquidations = Some(create_test_liquidations(4_000_000.0, 32_000_000.0));

    assert_eq!(types_of(&alerts_between(&prev, &current)), vec![AlertType::HeavyPump]);
}

#[test]
fn test_liquidations_below_total_threshold_are_quiet() {
    let prev = create_test_snapshot("ETHUSDT", 3000.0, 5e8, 0.01);
    let mut current = create_test_snapshot("ETHUSDT", 3000.0, 5e8, 0.01);
    current.liquidations = Some(create_test_liquidations(29_000_000.0, 0.0));

    assert!(alerts_between(&prev, &current).is_empty());
}

#[test]
fn test_liquidation_pressure_flip() {
    let mut prev = create_test_snapshot("SOLUSDT", 150.0, 1e8, 0.01);
    prev.liquidations = Some(create_test_liquidations(8_000_000.0, 1_000_000.0));
    let mut current = create_test_snapshot("SOLUSDT", 150.5, 1e8, 0.01);
    current.liquidations = Some(create_test_liquidations(1_000_000.0, 8_000_000.0));

    assert_eq!(state_of(&prev).liquidation_pressure, LiquidationPressure::LongsSqueezed);
    assert_eq!(
        types_of(&alerts_between(&prev, &current)),
        vec![AlertType::LiquidationFlip]
    );

    // Moving to balanced is not a flip
    let mut calm = current.clone();
    calm.liquidations = Some(create_test_liquidations(1_000_000.0, 1_000_000.0));
    assert!(alerts_between(&prev, &calm).is_empty());
}

#[test]
fn test_funding_flip_to_negative() {
    let prev = create_test_snapshot("BTCUSDT", 60000.0, 1e9, 0.01);
    let current = create_test_snapshot("BTCUSDT", 60000.0, 1e9, -0.005);

    let alerts = alerts_between(&prev, &current);
    assert_eq!(types_of(&alerts), vec![AlertType::FundingFlipNeg]);
    assert_eq!(alerts[0].severity, AlertSeverity::Medium);
}

#[test]
fn test_funding_high_requires_rising_rate() {
    let prev = create_test_snapshot("BTCUSDT", 60000.0, 1e9, 0.04);
    let rising = create_test_snapshot("BTCUSDT", 60000.0, 1e9, 0.06);
    assert_eq!(
        types_of(&alerts_between(&prev, &rising)),
        vec![AlertType::FundingHigh]
    );

    let prev_higher = create_test_snapshot("BTCUSDT", 60000.0, 1e9, 0.08);
    assert!(alerts_between(&prev_higher, &rising).is_empty());
}

#[test]
fn test_oi_spike_overlaps_volatility_warning() {
    let prev = create_test_snapshot("BTCUSDT", 60000.0, 1_000_000_000.0, 0.01);
    let current = create_test_snapshot("BTCUSDT", 60100.0, 1_060_000_000.0, 0.01);

    let fired = types_of(&alerts_between(&prev, &current));
    assert_eq!(fired.len(), 2);
    assert!(fired.contains(&AlertType::VolatilityWarning));
    assert!(fired.contains(&AlertType::OiSpike));
}

#[test]
fn test_oi_drop_only_warns_volatility() {
    let prev = create_test_snapshot("BTCUSDT", 60000.0, 1_000_000_000.0, 0.01);
    let current = create_test_snapshot("BTCUSDT", 60000.0, 950_000_000.0, 0.01);

    assert_eq!(
        types_of(&alerts_between(&prev, &current)),
        vec![AlertType::VolatilityWarning]
    );
}

#[test]
fn test_zero_previous_values_skip_ratio_rules() {
    let prev = create_test_snapshot("NEWUSDT", 0.0, 0.0, 0.01);
    let current = create_test_snapshot("NEWUSDT", 1.0, 1_000_000.0, 0.01);

    assert!(alerts_between(&prev, &current).is_empty());
}

#[test]
fn test_whale_shift_and_divergence() {
    let mut prev = create_test_snapshot("BTCUSDT", 60000.0, 1e9, 0.01);
    prev.whale_long_short_ratio = Some(1.0);
    let mut current = prev.clone();
    current.whale_long_short_ratio = Some(0.7);
    current.long_short_ratio = 1.4;

    assert_eq!(state_of(&prev).whale_status, WhaleStatus::Watching);
    let fired = types_of(&alerts_between(&prev, &current));
    assert_eq!(fired, vec![AlertType::WhaleShift, AlertType::WhaleDivergence]);
}

#[test]
fn test_missing_whale_data_never_diverges() {
    let prev = create_test_snapshot("BTCUSDT", 60000.0, 1e9, 0.01);
    let mut current = prev.clone();
    current.long_short_ratio = 3.0;

    assert!(alerts_between(&prev, &current).is_empty());
}

#[test]
fn test_batch_reports_highest_severity() {
    let prev = create_test_snapshot("BTCUSDT", 60000.0, 1_000_000_000.0, 0.01);
    let current = create_test_snapshot("BTCUSDT", 60100.0, 1_060_000_000.0, 0.01);

    let batch = AlertBatch::new("BTCUSDT", alerts_between(&prev, &current));
    assert!(!batch.is_empty());
    assert_eq!(batch.highest_severity(), Some(AlertSeverity::Medium));
    assert_eq!(AlertBatch::new("BTCUSDT", Vec::new()).highest_severity(), None);
}
