// Market Alert Pipeline Integration Tests
// snapshot -> signals -> alerts -> rate limit -> dispatch, over the shared store

use async_trait::async_trait;
use market_pulse::services::core::infrastructure::{
    AdaptiveTtlEstimator, CacheAside, KvStoreAdapter,
};
use market_pulse::services::core::market_data::{
    AlertDispatcher, KvMarketStateStore, MarketDataSource, MarketMonitorConfig, MarketStateStore,
};
use market_pulse::test_utils::{create_test_liquidations, create_test_snapshot};
use market_pulse::{
    AlertBatch, AlertSeverity, AlertType, MarketAlertMonitor, MarketSnapshot, PulseError,
    PulseResult,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct ScriptedSource {
    snapshots: Mutex<HashMap<String, MarketSnapshot>>,
}

impl ScriptedSource {
    fn publish(&self, snapshot: MarketSnapshot) {
        self.snapshots
            .lock()
            .unwrap()
            .insert(snapshot.symbol.clone(), snapshot);
    }
}

#[async_trait]
impl MarketDataSource for ScriptedSource {
    async fn fetch_snapshot(&self, symbol: &str) -> PulseResult<MarketSnapshot> {
        self.snapshots
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .ok_or_else(|| PulseError::fetch_error(format!("no data for {}", symbol)))
    }
}

#[derive(Default)]
struct RecordingAlertDispatcher {
    batches: Mutex<Vec<AlertBatch>>,
    fail_next: AtomicBool,
}

impl RecordingAlertDispatcher {
    fn dispatched(&self) -> Vec<AlertBatch> {
        self.batches.lock().unwrap().clone()
    }

    fn fail_once(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl AlertDispatcher for RecordingAlertDispatcher {
    async fn dispatch(&self, batch: &AlertBatch) -> PulseResult<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(PulseError::service_unavailable("notifier down"));
        }
        self.batches.lock().unwrap().push(batch.clone());
        Ok(())
    }
}

struct Harness {
    store: Arc<KvStoreAdapter>,
    source: Arc<ScriptedSource>,
    dispatcher: Arc<RecordingAlertDispatcher>,
    monitor: MarketAlertMonitor,
}

impl Harness {
    fn new(symbols: &[&str], rate_limit_enabled: bool) -> Self {
        let store = Arc::new(KvStoreAdapter::local_only());
        let cache = CacheAside::new(
            store.clone(),
            Arc::new(AdaptiveTtlEstimator::default()),
            10,
            Duration::from_millis(50),
        );
        let source = Arc::new(ScriptedSource::default());
        let dispatcher = Arc::new(RecordingAlertDispatcher::default());
        let config = MarketMonitorConfig {
            symbols: symbols.iter().map(|s| s.to_string()).collect(),
            rate_limit_enabled,
            ..MarketMonitorConfig::default()
        };
        let monitor = MarketAlertMonitor::new(
            config,
            cache,
            source.clone(),
            Arc::new(KvMarketStateStore::new(store.clone())),
            dispatcher.clone(),
        )
        .unwrap();

        Self {
            store,
            source,
            dispatcher,
            monitor,
        }
    }

    /// Publish a new snapshot and drop the cached one so the next tick sees it.
    async fn advance(&self, snapshot: MarketSnapshot) {
        self.store
            .delete(&MarketAlertMonitor::snapshot_key(&snapshot.symbol))
            .await;
        self.source.publish(snapshot);
    }
}

#[tokio::test]
async fn test_cold_start_then_price_crash() {
    let harness = Harness::new(&["BTCUSDT"], true);

    harness
        .advance(create_test_snapshot("BTCUSDT", 90000.0, 1e9, 0.01))
        .await;
    let first = harness.monitor.run_tick("BTCUSDT").await.unwrap();
    assert!(first.is_empty());
    assert!(harness.dispatcher.dispatched().is_empty());
    assert!(harness.store.exists("market:state:BTCUSDT").await);

    let mut crash = create_test_snapshot("BTCUSDT", 88000.0, 1e9, 0.01);
    crash.liquidations = Some(create_test_liquidations(0.0, 0.0));
    harness.advance(crash).await;

    let second = harness.monitor.run_tick("BTCUSDT").await.unwrap();
    assert_eq!(second.alerts.len(), 1);
    assert_eq!(second.alerts[0].alert_type, AlertType::PriceDrop);
    assert_eq!(second.highest_severity(), Some(AlertSeverity::High));

    let dispatched = harness.dispatcher.dispatched();
    assert_eq!(dispatched.len(), 1);
    assert_eq!(dispatched[0].batch_id, second.batch_id);
}

#[tokio::test]
async fn test_state_advances_between_ticks() {
    let harness = Harness::new(&["ETHUSDT"], true);
    let states = KvMarketStateStore::new(harness.store.clone());

    harness
        .advance(create_test_snapshot("ETHUSDT", 3000.0, 5e8, 0.01))
        .await;
    harness.monitor.run_tick("ETHUSDT").await.unwrap();
    harness
        .advance(create_test_snapshot("ETHUSDT", 3010.0, 5e8, 0.02))
        .await;
    harness.monitor.run_tick("ETHUSDT").await.unwrap();

    let record = states.load("ETHUSDT").await.unwrap().unwrap();
    assert_eq!(record.price, 3010.0);
    assert_eq!(record.funding_rate, 0.02);
}

#[tokio::test]
async fn test_repeat_alert_is_rate_limited() {
    let harness = Harness::new(&["BTCUSDT"], true);

    for price in [90000.0, 88000.0, 86000.0] {
        harness
            .advance(create_test_snapshot("BTCUSDT", price, 1e9, 0.01))
            .await;
        harness.monitor.run_tick("BTCUSDT").await.unwrap();
    }

    // Both drops were detected; only the first got past the cooldown
    let dispatched = harness.dispatcher.dispatched();
    assert_eq!(dispatched.len(), 1);
    assert!(harness.store.exists("alert_rl:BTCUSDT:price_drop").await);
}

#[tokio::test]
async fn test_failed_delivery_is_retried_on_next_tick() {
    let harness = Harness::new(&["BTCUSDT"], true);

    harness
        .advance(create_test_snapshot("BTCUSDT", 90000.0, 1e9, 0.01))
        .await;
    harness.monitor.run_tick("BTCUSDT").await.unwrap();

    harness
        .advance(create_test_snapshot("BTCUSDT", 88000.0, 1e9, 0.01))
        .await;
    harness.dispatcher.fail_once();
    let failed = harness.monitor.run_tick("BTCUSDT").await;
    assert!(failed.is_err());
    assert!(harness.dispatcher.dispatched().is_empty());
    assert!(!harness.store.exists("alert_rl:BTCUSDT:price_drop").await);

    // Same cached snapshot, state not advanced: the drop is detected and delivered
    let retry = harness.monitor.run_tick("BTCUSDT").await.unwrap();
    assert_eq!(retry.alerts.len(), 1);
    assert_eq!(retry.alerts[0].alert_type, AlertType::PriceDrop);
    assert_eq!(harness.dispatcher.dispatched().len(), 1);
    assert!(harness.store.exists("alert_rl:BTCUSDT:price_drop").await);
}

#[tokio::test]
async fn test_repeat_alert_passes_without_rate_limit() {
    let harness = Harness::new(&["BTCUSDT"], false);

    for price in [90000.0, 88000.0, 86000.0] {
        harness
            .advance(create_test_snapshot("BTCUSDT", price, 1e9, 0.01))
            .await;
        harness.monitor.run_tick("BTCUSDT").await.unwrap();
    }

    assert_eq!(harness.dispatcher.dispatched().len(), 2);
    assert!(!harness.store.exists("alert_rl:BTCUSDT:price_drop").await);
}

#[tokio::test]
async fn test_cached_snapshot_is_reused_within_ttl() {
    let harness = Harness::new(&["BTCUSDT"], true);

    harness
        .advance(create_test_snapshot("BTCUSDT", 90000.0, 1e9, 0.01))
        .await;
    harness.monitor.run_tick("BTCUSDT").await.unwrap();

    // Source moves but the cached snapshot still answers
    harness
        .source
        .publish(create_test_snapshot("BTCUSDT", 80000.0, 1e9, 0.01));
    let batch = harness.monitor.run_tick("BTCUSDT").await.unwrap();
    assert!(batch.is_empty());
}

#[tokio::test]
async fn test_run_all_isolates_failing_market() {
    let harness = Harness::new(&["BTCUSDT", "DOGEUSDT", "ETHUSDT"], true);
    harness
        .advance(create_test_snapshot("BTCUSDT", 60000.0, 1e9, 0.01))
        .await;
    harness
        .advance(create_test_snapshot("ETHUSDT", 3000.0, 5e8, 0.01))
        .await;

    let report = harness.monitor.run_all().await;
    assert_eq!(report.failed, vec!["DOGEUSDT".to_string()]);
    assert_eq!(report.batches.len(), 2);
    assert_eq!(report.alert_count(), 0);
    assert!(harness.store.exists("market:state:ETHUSDT").await);
    assert!(!harness.store.exists("market:state:DOGEUSDT").await);
}
