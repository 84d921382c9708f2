// KV Store Adapter - remote-first reads/writes with a transparent in-process fallback

use super::config::Environment;
use super::kv_backend::KvBackend;
use super::memory_store::MemoryKvStore;
use crate::utils::error::{KvOperationError, KvResult};
use crate::utils::logger::Logger;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

static MISSING_REMOTE_WARNED: AtomicBool = AtomicBool::new(false);

/// Counters describing how often the adapter had to degrade.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdapterStats {
    pub remote_errors: u64,
    pub fallback_reads: u64,
    pub fallback_writes: u64,
}

#[derive(Debug, Default)]
struct AdapterCounters {
    remote_errors: AtomicU64,
    fallback_reads: AtomicU64,
    fallback_writes: AtomicU64,
}

/// Fail-soft key-value adapter.
///
/// Every call goes to the remote backend first. A remote failure is logged and the
/// same operation is replayed against the in-process [`MemoryKvStore`], so callers
/// never see transport errors. The one exception is [`KvStoreAdapter::set_if_absent`],
/// whose errors the distributed lock needs to see.
pub struct KvStoreAdapter {
    remote: Option<Arc<dyn KvBackend>>,
    fallback: MemoryKvStore,
    counters: AdapterCounters,
    logger: Logger,
}

impl KvStoreAdapter {
    pub fn new(remote: Option<Arc<dyn KvBackend>>, environment: Environment) -> Self {
        let logger = Logger::for_component("kv_store");

        if remote.is_none()
            && environment == Environment::Production
            && !MISSING_REMOTE_WARNED.swap(true, Ordering::SeqCst)
        {
            logger.warn(
                "No remote KV store configured in production; cache state is local to this process",
            );
        }

        Self {
            remote,
            fallback: MemoryKvStore::new(),
            counters: AdapterCounters::default(),
            logger,
        }
    }

    /// Adapter that only ever uses the in-process store.
    pub fn local_only() -> Self {
        Self::new(None, Environment::Development)
    }

    /// Whether the once-per-process missing-remote warning has fired.
    pub fn missing_remote_warned() -> bool {
        MISSING_REMOTE_WARNED.load(Ordering::SeqCst)
    }

    pub fn remote(&self) -> Option<&Arc<dyn KvBackend>> {
        self.remote.as_ref()
    }

    pub fn is_remote_configured(&self) -> bool {
        self.remote.is_some()
    }

    pub fn fallback(&self) -> &MemoryKvStore {
        &self.fallback
    }

    pub fn stats(&self) -> AdapterStats {
        AdapterStats {
            remote_errors: self.counters.remote_errors.load(Ordering::Relaxed),
            fallback_reads: self.counters.fallback_reads.load(Ordering::Relaxed),
            fallback_writes: self.counters.fallback_writes.load(Ordering::Relaxed),
        }
    }

    fn note_remote_failure(&self, operation: &str, key: &str, error: &KvOperationError) {
        self.counters.remote_errors.fetch_add(1, Ordering::Relaxed);
        self.logger.warn_with_error(
            "Remote KV operation failed, using in-process store",
            error,
            Some(&serde_json::json!({ "operation": operation, "key": key })),
        );
    }

    fn note_fallback_read(&self) {
        self.counters.fallback_reads.fetch_add(1, Ordering::Relaxed);
    }

    fn note_fallback_write(&self) {
        self.counters.fallback_writes.fetch_add(1, Ordering::Relaxed);
    }

    fn log_local_failure(&self, operation: &str, key: &str, error: &KvOperationError) {
        self.logger.error_with_error(
            "In-process KV operation failed",
            error,
            Some(&serde_json::json!({ "operation": operation, "key": key })),
        );
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        if let Some(remote) = &self.remote {
            match remote.get(key).await {
                Ok(value) => return value,
                Err(e) => self.note_remote_failure("get", key, &e),
            }
        }

        self.note_fallback_read();
        match self.fallback.get(key).await {
            Ok(value) => value,
            Err(e) => {
                self.log_local_failure("get", key, &e);
                None
            }
        }
    }

    pub async fn set(&self, key: &str, value: &str, ttl_seconds: u64) {
        if let Some(remote) = &self.remote {
            match remote.set(key, value, ttl_seconds).await {
                Ok(()) => return,
                Err(e) => self.note_remote_failure("set", key, &e),
            }
        }

        self.note_fallback_write();
        if let Err(e) = self.fallback.set(key, value, ttl_seconds).await {
            self.log_local_failure("set", key, &e);
        }
    }

    pub async fn delete(&self, key: &str) {
        if let Some(remote) = &self.remote {
            match remote.delete(key).await {
                Ok(()) => return,
                Err(e) => self.note_remote_failure("delete", key, &e),
            }
        }

        self.note_fallback_write();
        if let Err(e) = self.fallback.delete(key).await {
            self.log_local_failure("delete", key, &e);
        }
    }

    /// Atomic counter with the TTL reset on every call. Returns `0` only when both
    /// the remote and the local store failed.
    pub async fn increment(&self, key: &str, ttl_seconds: u64) -> i64 {
        if let Some(remote) = &self.remote {
            match remote.increment(key, ttl_seconds).await {
                Ok(count) => return count,
                Err(e) => self.note_remote_failure("increment", key, &e),
            }
        }

        self.note_fallback_write();
        match self.fallback.increment(key, ttl_seconds).await {
            Ok(count) => count,
            Err(e) => {
                self.log_local_failure("increment", key, &e);
                0
            }
        }
    }

    pub async fn exists(&self, key: &str) -> bool {
        if let Some(remote) = &self.remote {
            match remote.exists(key).await {
                Ok(found) => return found,
                Err(e) => self.note_remote_failure("exists", key, &e),
            }
        }

        self.note_fallback_read();
        match self.fallback.exists(key).await {
            Ok(found) => found,
            Err(e) => {
                self.log_local_failure("exists", key, &e);
                false
            }
        }
    }

    /// Conditional create. Transport errors are returned, not absorbed.
    pub async fn set_if_absent(&self, key: &str, value: &str, ttl_seconds: u64) -> KvResult<bool> {
        match &self.remote {
            Some(remote) => remote.set_if_absent(key, value, ttl_seconds).await,
            None => self.fallback.set_if_absent(key, value, ttl_seconds).await,
        }
    }

    /// Typed read. A value that does not decode as `T` is logged and read as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                self.logger.warn_with_error(
                    "Cached value failed to decode",
                    &e,
                    Some(&serde_json::json!({ "key": key })),
                );
                None
            }
        }
    }

    pub async fn set_json<T: Serialize>(&self, key: &str, value: &T, ttl_seconds: u64) -> KvResult<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, &raw, ttl_seconds).await;
        Ok(())
    }
}
