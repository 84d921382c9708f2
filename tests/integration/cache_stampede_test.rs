// Cache Stampede Integration Tests
// Concurrent cache-aside callers on a cold key must share a single recompute

use futures::future::join_all;
use market_pulse::services::core::infrastructure::{
    AdaptiveTtlEstimator, CacheAside, CacheAsideOptions, Environment, KvBackend, KvStoreAdapter,
};
use market_pulse::test_utils::MockKvBackend;
use market_pulse::PulseError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn cache_over(store: Arc<KvStoreAdapter>) -> CacheAside {
    CacheAside::new(
        store,
        Arc::new(AdaptiveTtlEstimator::default()),
        10,
        Duration::from_millis(100),
    )
}

async fn slow_fetch(calls: &AtomicUsize) -> Result<String, PulseError> {
    calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok("computed".to_string())
}

#[tokio::test]
async fn test_concurrent_misses_fetch_once_local_store() {
    let cache = cache_over(Arc::new(KvStoreAdapter::local_only()));
    let calls = &AtomicUsize::new(0);

    let results = join_all((0..20).map(|_| {
        let cache = cache.clone();
        async move {
            cache
                .get_or_compute(
                    "analysis:btc",
                    300,
                    move || slow_fetch(calls),
                    CacheAsideOptions::new(),
                )
                .await
        }
    }))
    .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    for result in results {
        assert_eq!(result.unwrap().as_deref(), Some("computed"));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_fetch_once_across_tasks() {
    let remote = Arc::new(MockKvBackend::new());
    let store = Arc::new(KvStoreAdapter::new(Some(remote.clone()), Environment::Test));
    let cache = cache_over(store);
    let calls = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let cache = cache.clone();
            let calls = calls.clone();
            tokio::spawn(async move {
                cache
                    .get_or_compute(
                        "market:snapshot:BTCUSDT",
                        30,
                        move || async move { slow_fetch(&calls).await },
                        CacheAsideOptions::new(),
                    )
                    .await
            })
        })
        .collect();

    for handle in handles {
        let value = handle.await.expect("task panicked").expect("no hard failure");
        assert_eq!(value.as_deref(), Some("computed"));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!remote.exists("lock:market:snapshot:BTCUSDT").await.unwrap());
    assert!(remote.exists("market:snapshot:BTCUSDT").await.unwrap());
}

#[tokio::test]
async fn test_fail_open_when_lock_backend_errors() {
    let remote = Arc::new(MockKvBackend::new());
    remote.simulate_error("timeout");
    let store = Arc::new(KvStoreAdapter::new(Some(remote), Environment::Test));
    let cache = cache_over(store.clone());
    let calls = &AtomicUsize::new(0);

    let value = tokio::time::timeout(
        Duration::from_secs(2),
        cache.get_or_compute("k", 60, move || slow_fetch(calls), CacheAsideOptions::new()),
    )
    .await
    .expect("get_or_compute must not hang")
    .unwrap();

    assert_eq!(value.as_deref(), Some("computed"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    // Value landed in the fallback store, so the next call is a hit
    assert_eq!(store.get("k").await.as_deref(), Some("\"computed\""));
}

#[tokio::test]
async fn test_sequential_calls_reuse_cached_value() {
    let cache = cache_over(Arc::new(KvStoreAdapter::local_only()));
    let calls = &AtomicUsize::new(0);

    for _ in 0..5 {
        cache
            .get_or_compute("content:home", 3600, move || slow_fetch(calls), CacheAsideOptions::new())
            .await
            .unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
