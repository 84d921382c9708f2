// Batch Operations - pipelined multi-key reads/writes against the remote store

use super::kv_backend::{BatchEntry, KvBackend};
use super::kv_store::KvStoreAdapter;
use crate::utils::logger::Logger;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// One typed entry for [`BatchOperations::set_batch`].
#[derive(Debug, Clone)]
pub struct BatchSetEntry<T> {
    pub key: String,
    pub value: T,
    pub ttl_seconds: u64,
}

impl<T> BatchSetEntry<T> {
    pub fn new(key: impl Into<String>, value: T, ttl_seconds: u64) -> Self {
        Self {
            key: key.into(),
            value,
            ttl_seconds,
        }
    }
}

/// Multi-key operations, one pipelined round trip per call.
///
/// Batches only run against the remote store. When it is missing or the pipeline
/// fails, reads come back empty and writes are dropped; there is no in-process batch
/// fallback. Per-key decode failures drop that key and keep the rest.
pub struct BatchOperations {
    store: Arc<KvStoreAdapter>,
    logger: Logger,
}

impl BatchOperations {
    pub fn new(store: Arc<KvStoreAdapter>) -> Self {
        Self {
            store,
            logger: Logger::for_component("batch_operations"),
        }
    }

    fn remote(&self, operation: &str, key_count: usize) -> Option<&Arc<dyn KvBackend>> {
        let remote = self.store.remote();
        if remote.is_none() {
            self.logger.debug_with_meta(
                "Batch operation skipped, no remote store configured",
                &serde_json::json!({ "operation": operation, "keys": key_count }),
            );
        }
        remote
    }

    fn log_pipeline_failure(&self, operation: &str, key_count: usize, error: &dyn std::error::Error) {
        self.logger.warn_with_error(
            "Batch pipeline failed",
            error,
            Some(&serde_json::json!({ "operation": operation, "keys": key_count })),
        );
    }

    pub async fn get_batch<T: DeserializeOwned>(&self, keys: &[String]) -> HashMap<String, T> {
        let mut found = HashMap::new();
        if keys.is_empty() {
            return found;
        }
        let Some(remote) = self.remote("get_batch", keys.len()) else {
            return found;
        };

        let values = match remote.get_many(keys).await {
            Ok(values) => values,
            Err(e) => {
                self.log_pipeline_failure("get_batch", keys.len(), &e);
                return found;
            }
        };

        for (key, raw) in keys.iter().zip(values) {
            let Some(raw) = raw else { continue };
            match serde_json::from_str::<T>(&raw) {
                Ok(value) => {
                    found.insert(key.clone(), value);
                }
                Err(e) => self.logger.warn_with_error(
                    "Batch value failed to decode, omitting key",
                    &e,
                    Some(&serde_json::json!({ "key": key })),
                ),
            }
        }
        found
    }

    /// Returns how many entries were sent to the store.
    pub async fn set_batch<T: Serialize>(&self, entries: &[BatchSetEntry<T>]) -> usize {
        if entries.is_empty() {
            return 0;
        }
        let Some(remote) = self.remote("set_batch", entries.len()) else {
            return 0;
        };

        let encoded: Vec<BatchEntry> = entries
            .iter()
            .filter_map(|entry| match serde_json::to_string(&entry.value) {
                Ok(raw) => Some(BatchEntry::new(entry.key.clone(), raw, entry.ttl_seconds)),
                Err(e) => {
                    self.logger.warn_with_error(
                        "Batch value failed to encode, skipping entry",
                        &e,
                        Some(&serde_json::json!({ "key": entry.key })),
                    );
                    None
                }
            })
            .collect();

        if encoded.is_empty() {
            return 0;
        }
        match remote.set_many(&encoded).await {
            Ok(()) => encoded.len(),
            Err(e) => {
                self.log_pipeline_failure("set_batch", encoded.len(), &e);
                0
            }
        }
    }

    pub async fn exists_batch(&self, keys: &[String]) -> HashMap<String, bool> {
        if keys.is_empty() {
            return HashMap::new();
        }
        let Some(remote) = self.remote("exists_batch", keys.len()) else {
            return HashMap::new();
        };
        match remote.exists_many(keys).await {
            Ok(flags) => keys.iter().cloned().zip(flags).collect(),
            Err(e) => {
                self.log_pipeline_failure("exists_batch", keys.len(), &e);
                HashMap::new()
            }
        }
    }

    /// Remaining TTL in seconds; keys that are missing or never expire are omitted.
    pub async fn ttl_batch(&self, keys: &[String]) -> HashMap<String, u64> {
        if keys.is_empty() {
            return HashMap::new();
        }
        let Some(remote) = self.remote("ttl_batch", keys.len()) else {
            return HashMap::new();
        };
        match remote.ttl_many(keys).await {
            Ok(ttls) => keys
                .iter()
                .zip(ttls)
                .filter_map(|(key, ttl)| ttl.map(|t| (key.clone(), t)))
                .collect(),
            Err(e) => {
                self.log_pipeline_failure("ttl_batch", keys.len(), &e);
                HashMap::new()
            }
        }
    }

    /// Returns how many keys were removed.
    pub async fn delete_batch(&self, keys: &[String]) -> u64 {
        if keys.is_empty() {
            return 0;
        }
        let Some(remote) = self.remote("delete_batch", keys.len()) else {
            return 0;
        };
        match remote.delete_many(keys).await {
            Ok(removed) => removed,
            Err(e) => {
                self.log_pipeline_failure("delete_batch", keys.len(), &e);
                0
            }
        }
    }
}
