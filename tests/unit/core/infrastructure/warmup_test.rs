// Cache Warm-Up Unit Tests

use futures::FutureExt;
use market_pulse::services::core::infrastructure::{
    KvStoreAdapter, WarmupItem, WarmupPriority, WarmupReport, WarmupScheduler,
};
use market_pulse::PulseError;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn ok_item(key: &str, priority: WarmupPriority, value: Value) -> WarmupItem {
    WarmupItem::new(key, 300, priority, move || {
        let value = value.clone();
        async move { Ok(value) }.boxed()
    })
}

fn failing_item(key: &str, priority: WarmupPriority) -> WarmupItem {
    WarmupItem::new(key, 300, priority, || {
        async { Err(PulseError::fetch_error("upstream unavailable")) }.boxed()
    })
}

#[tokio::test]
async fn test_failing_item_does_not_abort_others() {
    let store = Arc::new(KvStoreAdapter::local_only());
    let scheduler = WarmupScheduler::new(store.clone());

    let report = scheduler
        .warmup(vec![
            ok_item("content:home", WarmupPriority::High, json!({ "title": "home" })),
            failing_item("analysis:btc", WarmupPriority::High),
            ok_item("market:snapshot:ETHUSDT", WarmupPriority::Medium, json!(3100.5)),
        ])
        .await;

    assert_eq!(
        report,
        WarmupReport {
            total: 3,
            successful: 2,
            failed: 1,
            skipped: 0,
            background: 0,
        }
    );
    assert!(store.exists("content:home").await);
    assert!(store.exists("market:snapshot:ETHUSDT").await);
    assert!(!store.exists("analysis:btc").await);
    assert_eq!(store.get_json::<f64>("market:snapshot:ETHUSDT").await, Some(3100.5));
}

#[tokio::test]
async fn test_high_priority_items_run_in_order() {
    let store = Arc::new(KvStoreAdapter::local_only());
    let scheduler = WarmupScheduler::new(store);
    let order = Arc::new(Mutex::new(Vec::new()));

    let items = (0..3)
        .map(|i| {
            let order = order.clone();
            WarmupItem::new(format!("k{}", i), 60, WarmupPriority::High, move || {
                let order = order.clone();
                async move {
                    // Later items finish faster, so only sequential execution keeps order
                    tokio::time::sleep(Duration::from_millis(30 - i * 10)).await;
                    if let Ok(mut seen) = order.lock() {
                        seen.push(i);
                    }
                    Ok(Value::from(i))
                }
                .boxed()
            })
        })
        .collect();

    let report = scheduler.warmup(items).await;
    assert_eq!(report.successful, 3);
    assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
}

#[tokio::test]
async fn test_background_items_land_eventually() {
    let store = Arc::new(KvStoreAdapter::local_only());
    let scheduler = WarmupScheduler::new(store.clone());

    let report = scheduler
        .warmup(vec![
            ok_item("content:faq", WarmupPriority::Low, json!("faq")),
            failing_item("content:blog", WarmupPriority::Low),
        ])
        .await;

    assert_eq!(report.total, 2);
    assert_eq!(report.background, 2);
    assert_eq!(report.successful + report.failed + report.skipped, 0);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(store.exists("content:faq").await);
    assert!(!store.exists("content:blog").await);
}

#[tokio::test]
async fn test_empty_item_list() {
    let scheduler = WarmupScheduler::new(Arc::new(KvStoreAdapter::local_only()));
    assert_eq!(scheduler.warmup(Vec::new()).await, WarmupReport::default());
}
