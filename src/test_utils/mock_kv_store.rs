use crate::services::core::infrastructure::kv_backend::{BatchEntry, KvBackend};
use crate::services::core::infrastructure::memory_store::MemoryKvStore;
use crate::utils::error::{KvOperationError, KvResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

// Mock remote KV backend for testing
pub struct MockKvBackend {
    data: MemoryKvStore,
    error_simulation: Mutex<Option<String>>,
    operation_count: AtomicU32,
    info: HashMap<String, String>,
}

impl Default for MockKvBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockKvBackend {
    pub fn new() -> Self {
        Self {
            data: MemoryKvStore::new(),
            error_simulation: Mutex::new(None),
            operation_count: AtomicU32::new(0),
            info: HashMap::new(),
        }
    }

    /// Canned `INFO` fields returned by [`KvBackend::info`].
    pub fn with_info(mut self, info: HashMap<String, String>) -> Self {
        self.info = info;
        self
    }

    /// Make every following call fail: "timeout", "connection", or anything else for a storage error.
    pub fn simulate_error(&self, error_type: &str) {
        if let Ok(mut slot) = self.error_simulation.lock() {
            *slot = Some(error_type.to_string());
        }
    }

    pub fn reset_error_simulation(&self) {
        if let Ok(mut slot) = self.error_simulation.lock() {
            *slot = None;
        }
    }

    pub fn set_should_fail(&self, should_fail: bool) {
        if should_fail {
            self.simulate_error("connection");
        } else {
            self.reset_error_simulation();
        }
    }

    pub fn operation_count(&self) -> u32 {
        self.operation_count.load(Ordering::SeqCst)
    }

    /// Entries physically held, expired ones included.
    pub fn stored_len(&self) -> usize {
        self.data.len()
    }

    fn check(&self) -> KvResult<()> {
        self.operation_count.fetch_add(1, Ordering::SeqCst);
        let simulated = self
            .error_simulation
            .lock()
            .map(|slot| slot.clone())
            .unwrap_or(None);
        match simulated.as_deref() {
            None => Ok(()),
            Some("timeout") => Err(KvOperationError::Timeout(500)),
            Some("connection") => Err(KvOperationError::Connection(
                "Connection refused (simulated)".to_string(),
            )),
            Some(other) => Err(KvOperationError::Storage(format!("simulated {}", other))),
        }
    }
}

#[async_trait]
impl KvBackend for MockKvBackend {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        self.check()?;
        self.data.get(key).await
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> KvResult<()> {
        self.check()?;
        self.data.set(key, value, ttl_seconds).await
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl_seconds: u64) -> KvResult<bool> {
        self.check()?;
        self.data.set_if_absent(key, value, ttl_seconds).await
    }

    async fn delete(&self, key: &str) -> KvResult<()> {
        self.check()?;
        self.data.delete(key).await
    }

    async fn increment(&self, key: &str, ttl_seconds: u64) -> KvResult<i64> {
        self.check()?;
        self.data.increment(key, ttl_seconds).await
    }

    async fn exists(&self, key: &str) -> KvResult<bool> {
        self.check()?;
        self.data.exists(key).await
    }

    async fn get_many(&self, keys: &[String]) -> KvResult<Vec<Option<String>>> {
        self.check()?;
        self.data.get_many(keys).await
    }

    async fn set_many(&self, entries: &[BatchEntry]) -> KvResult<()> {
        self.check()?;
        self.data.set_many(entries).await
    }

    async fn delete_many(&self, keys: &[String]) -> KvResult<u64> {
        self.check()?;
        self.data.delete_many(keys).await
    }

    async fn exists_many(&self, keys: &[String]) -> KvResult<Vec<bool>> {
        self.check()?;
        self.data.exists_many(keys).await
    }

    async fn ttl_many(&self, keys: &[String]) -> KvResult<Vec<Option<u64>>> {
        self.check()?;
        self.data.ttl_many(keys).await
    }

    async fn info(&self) -> KvResult<HashMap<String, String>> {
        self.check()?;
        Ok(self.info.clone())
    }
}
