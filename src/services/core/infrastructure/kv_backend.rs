// KV Backend Module - Remote/local key-value surface shared by the adapter, lock and batch ops

use crate::utils::error::KvResult;
use async_trait::async_trait;
use std::collections::HashMap;

/// One entry of a pipelined write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchEntry {
    pub key: String,
    pub value: String,
    pub ttl_seconds: u64,
}

impl BatchEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>, ttl_seconds: u64) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ttl_seconds,
        }
    }
}

/// Key-value backend contract.
///
/// Values are opaque strings (JSON text in practice). A `ttl_seconds` of `0`
/// stores without expiry. The `*_many` calls must complete in a single round
/// trip and return results aligned with the input order.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Short backend identifier used in logs and health snapshots.
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> KvResult<Option<String>>;

    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> KvResult<()>;

    /// Create `key` only if it does not exist. Returns `true` when this call created it.
    async fn set_if_absent(&self, key: &str, value: &str, ttl_seconds: u64) -> KvResult<bool>;

    async fn delete(&self, key: &str) -> KvResult<()>;

    /// Atomically increment the counter at `key` and reset its expiry.
    async fn increment(&self, key: &str, ttl_seconds: u64) -> KvResult<i64>;

    async fn exists(&self, key: &str) -> KvResult<bool>;

    async fn get_many(&self, keys: &[String]) -> KvResult<Vec<Option<String>>>;

    async fn set_many(&self, entries: &[BatchEntry]) -> KvResult<()>;

    /// Returns the number of keys actually removed.
    async fn delete_many(&self, keys: &[String]) -> KvResult<u64>;

    async fn exists_many(&self, keys: &[String]) -> KvResult<Vec<bool>>;

    /// Remaining TTL per key; `None` for missing keys and keys without expiry.
    async fn ttl_many(&self, keys: &[String]) -> KvResult<Vec<Option<u64>>>;

    /// Server metrics as raw `field -> value` pairs. Empty when unsupported.
    async fn info(&self) -> KvResult<HashMap<String, String>>;
}
