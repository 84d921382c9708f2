// In-process KV store - fallback for the adapter and local-only deployments

use super::kv_backend::{BatchEntry, KvBackend};
use crate::utils::error::{KvOperationError, KvResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct MemoryEntry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryEntry {
    fn is_expired(&self, now: Instant) -> bool {
        matches!(self.expires_at, Some(at) if now >= at)
    }
}

/// Mutex-guarded map with per-entry expiry.
///
/// Expired entries read as misses even while still in the map; they are removed
/// lazily on access or by [`MemoryKvStore::purge_expired`]. The lock is never held
/// across an `.await`.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: Mutex<HashMap<String, MemoryEntry>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> KvResult<MutexGuard<'_, HashMap<String, MemoryEntry>>> {
        self.entries
            .lock()
            .map_err(|e| KvOperationError::Storage(format!("memory store poisoned: {}", e)))
    }

    fn expiry_for(ttl_seconds: u64) -> Option<Instant> {
        if ttl_seconds == 0 {
            None
        } else {
            Some(Instant::now() + Duration::from_secs(ttl_seconds))
        }
    }

    /// Insert with a sub-second TTL.
    pub fn insert_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> KvResult<()> {
        let mut entries = self.lock()?;
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        match self.entries.lock() {
            Ok(mut entries) => {
                let before = entries.len();
                entries.retain(|_, entry| !entry.is_expired(now));
                before - entries.len()
            }
            Err(_) => 0,
        }
    }

    /// Number of physically stored entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn live_value(entries: &mut HashMap<String, MemoryEntry>, key: &str) -> Option<String> {
        let now = Instant::now();
        match entries.get(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                None
            }
            Some(entry) => Some(entry.value.clone()),
            None => None,
        }
    }

    fn remaining_ttl(entries: &HashMap<String, MemoryEntry>, key: &str) -> Option<u64> {
        let now = Instant::now();
        let entry = entries.get(key)?;
        let expires_at = entry.expires_at?;
        if now >= expires_at {
            return None;
        }
        // Round partial seconds up, as Redis TTL does
        let remaining = expires_at - now;
        Some(remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0))
    }
}

#[async_trait]
impl KvBackend for MemoryKvStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> KvResult<Option<String>> {
        let mut entries = self.lock()?;
        Ok(Self::live_value(&mut entries, key))
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> KvResult<()> {
        let mut entries = self.lock()?;
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: Self::expiry_for(ttl_seconds),
            },
        );
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl_seconds: u64) -> KvResult<bool> {
        let mut entries = self.lock()?;
        if Self::live_value(&mut entries, key).is_some() {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: value.to_string(),
                expires_at: Self::expiry_for(ttl_seconds),
            },
        );
        Ok(true)
    }

    async fn delete(&self, key: &str) -> KvResult<()> {
        let mut entries = self.lock()?;
        entries.remove(key);
        Ok(())
    }

    async fn increment(&self, key: &str, ttl_seconds: u64) -> KvResult<i64> {
        let mut entries = self.lock()?;
        let current = match Self::live_value(&mut entries, key) {
            Some(raw) => raw.parse::<i64>().map_err(|_| {
                KvOperationError::Command(format!("value at {} is not an integer", key))
            })?,
            None => 0,
        };
        let next = current + 1;
        entries.insert(
            key.to_string(),
            MemoryEntry {
                value: next.to_string(),
                expires_at: Self::expiry_for(ttl_seconds),
            },
        );
        Ok(next)
    }

    async fn exists(&self, key: &str) -> KvResult<bool> {
        let mut entries = self.lock()?;
        Ok(Self::live_value(&mut entries, key).is_some())
    }

    async fn get_many(&self, keys: &[String]) -> KvResult<Vec<Option<String>>> {
        let mut entries = self.lock()?;
        Ok(keys
            .iter()
            .map(|key| Self::live_value(&mut entries, key))
            .collect())
    }

    async fn set_many(&self, batch: &[BatchEntry]) -> KvResult<()> {
        let mut entries = self.lock()?;
        for entry in batch {
            entries.insert(
                entry.key.clone(),
                MemoryEntry {
                    value: entry.value.clone(),
                    expires_at: Self::expiry_for(entry.ttl_seconds),
                },
            );
        }
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> KvResult<u64> {
        let mut entries = self.lock()?;
        let mut removed = 0;
        for key in keys {
            if Self::live_value(&mut entries, key).is_some() {
                entries.remove(key);
                removed += 1;
            }
        }
        Ok(removed)
    }

    async fn exists_many(&self, keys: &[String]) -> KvResult<Vec<bool>> {
        let mut entries = self.lock()?;
        Ok(keys
            .iter()
            .map(|key| Self::live_value(&mut entries, key).is_some())
            .collect())
    }

    async fn ttl_many(&self, keys: &[String]) -> KvResult<Vec<Option<u64>>> {
        let entries = self.lock()?;
        Ok(keys
            .iter()
            .map(|key| Self::remaining_ttl(&entries, key))
            .collect())
    }

    async fn info(&self) -> KvResult<HashMap<String, String>> {
        Ok(HashMap::new())
    }
}
