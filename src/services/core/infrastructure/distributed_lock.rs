// Distributed Lock - create-if-absent lock entries with automatic expiry

use super::kv_store::KvStoreAdapter;
use crate::utils::kv_standards::lock_key;
use crate::utils::logger::Logger;
use std::sync::Arc;

/// Shortest lifetime of a lock entry. A store TTL of 0 means "never expires".
pub const MIN_LOCK_TTL_SECONDS: u64 = 1;

/// Cooperative lock stored as `lock:<key>` in the shared KV store.
///
/// Acquire fails open: if the store cannot be reached the caller is told it holds
/// the lock, trading duplicate work for liveness. There is no holder token, so any
/// caller can release any lock; the TTL bounds how long a crashed holder blocks others.
#[derive(Clone)]
pub struct DistributedLock {
    store: Arc<KvStoreAdapter>,
    logger: Logger,
}

impl DistributedLock {
    pub fn new(store: Arc<KvStoreAdapter>) -> Self {
        Self {
            store,
            logger: Logger::for_component("distributed_lock"),
        }
    }

    /// `true` if this call created the lock entry, or if the store failed.
    ///
    /// The entry always expires: a `ttl_seconds` of 0 is raised to [`MIN_LOCK_TTL_SECONDS`].
    pub async fn acquire(&self, key: &str, ttl_seconds: u64) -> bool {
        let lock = lock_key(key);
        let ttl = ttl_seconds.max(MIN_LOCK_TTL_SECONDS);
        match self.store.set_if_absent(&lock, "1", ttl).await {
            Ok(acquired) => acquired,
            Err(e) => {
                self.logger.warn_with_error(
                    "Lock acquire failed, proceeding without lock",
                    &e,
                    Some(&serde_json::json!({ "lock_key": lock })),
                );
                true
            }
        }
    }

    /// Best-effort release; failures are absorbed by the adapter.
    pub async fn release(&self, key: &str) {
        self.store.delete(&lock_key(key)).await;
    }
}
