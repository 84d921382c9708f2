// Batch Operations Unit Tests

use market_pulse::services::core::infrastructure::{
    BatchOperations, BatchSetEntry, Environment, KvBackend, KvStoreAdapter,
};
use market_pulse::test_utils::MockKvBackend;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Quote {
    symbol: String,
    price: f64,
}

fn quote(symbol: &str, price: f64) -> Quote {
    Quote {
        symbol: symbol.to_string(),
        price,
    }
}

fn batch_over(remote: Arc<MockKvBackend>) -> BatchOperations {
    BatchOperations::new(Arc::new(KvStoreAdapter::new(Some(remote), Environment::Test)))
}

fn keys(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

#[tokio::test]
async fn test_get_batch_returns_only_present_keys() {
    let remote = Arc::new(MockKvBackend::new());
    let batch = batch_over(remote.clone());

    let written = batch
        .set_batch(&[
            BatchSetEntry::new("market:snapshot:BTCUSDT", quote("BTCUSDT", 64000.0), 60),
            BatchSetEntry::new("market:snapshot:ETHUSDT", quote("ETHUSDT", 3100.0), 60),
        ])
        .await;
    assert_eq!(written, 2);

    let found = batch
        .get_batch::<Quote>(&keys(&[
            "market:snapshot:BTCUSDT",
            "market:snapshot:SOLUSDT",
            "market:snapshot:ETHUSDT",
        ]))
        .await;

    assert_eq!(found.len(), 2);
    assert_eq!(found["market:snapshot:BTCUSDT"], quote("BTCUSDT", 64000.0));
    assert_eq!(found["market:snapshot:ETHUSDT"], quote("ETHUSDT", 3100.0));
    assert!(!found.contains_key("market:snapshot:SOLUSDT"));
}

#[tokio::test]
async fn test_undecodable_value_is_omitted() {
    let remote = Arc::new(MockKvBackend::new());
    remote.set("good", r#"{"symbol":"BTCUSDT","price":1.0}"#, 60).await.unwrap();
    remote.set("bad", "not json", 60).await.unwrap();
    let batch = batch_over(remote);

    let found = batch.get_batch::<Quote>(&keys(&["good", "bad"])).await;
    assert_eq!(found.len(), 1);
    assert_eq!(found["good"], quote("BTCUSDT", 1.0));
}

#[tokio::test]
async fn test_pipeline_failure_yields_empty_results() {
    let remote = Arc::new(MockKvBackend::new());
    remote.set("a", "1", 60).await.unwrap();
    remote.simulate_error("connection");
    let batch = batch_over(remote.clone());

    assert!(batch.get_batch::<u32>(&keys(&["a"])).await.is_empty());
    assert_eq!(batch.set_batch(&[BatchSetEntry::new("b", 2_u32, 60)]).await, 0);

    remote.reset_error_simulation();
    assert!(!remote.exists("b").await.unwrap());
}

#[tokio::test]
async fn test_exists_batch_covers_every_key() {
    let remote = Arc::new(MockKvBackend::new());
    remote.set("present", "1", 60).await.unwrap();
    let batch = batch_over(remote);

    let flags = batch.exists_batch(&keys(&["present", "absent"])).await;
    assert_eq!(flags.len(), 2);
    assert_eq!(flags["present"], true);
    assert_eq!(flags["absent"], false);
}

#[tokio::test]
async fn test_ttl_batch_omits_missing_and_unbounded_keys() {
    let remote = Arc::new(MockKvBackend::new());
    remote.set("short", "1", 30).await.unwrap();
    remote.set("forever", "1", 0).await.unwrap();
    let batch = batch_over(remote);

    let ttls = batch.ttl_batch(&keys(&["short", "forever", "missing"])).await;
    assert_eq!(ttls.len(), 1);
    assert!(ttls["short"] > 0 && ttls["short"] <= 30);
}

#[tokio::test]
async fn test_delete_batch_counts_removed_keys() {
    let remote = Arc::new(MockKvBackend::new());
    remote.set("a", "1", 60).await.unwrap();
    remote.set("b", "1", 60).await.unwrap();
    let batch = batch_over(remote.clone());

    assert_eq!(batch.delete_batch(&keys(&["a", "b", "c"])).await, 2);
    assert!(!remote.exists("a").await.unwrap());
    assert!(!remote.exists("b").await.unwrap());
}

#[tokio::test]
async fn test_batch_is_one_round_trip() {
    let remote = Arc::new(MockKvBackend::new());
    let batch = batch_over(remote.clone());

    let before = remote.operation_count();
    batch.get_batch::<u32>(&keys(&["a", "b", "c", "d"])).await;
    assert_eq!(remote.operation_count(), before + 1);
}
