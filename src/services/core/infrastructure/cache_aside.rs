// Cache-Aside Orchestrator - read-through caching with single-flight recompute across instances

use super::adaptive_ttl::{AdaptiveTtlEstimator, TtlBounds};
use super::distributed_lock::DistributedLock;
use super::kv_store::KvStoreAdapter;
use crate::utils::error::{PulseError, PulseResult};
use crate::utils::logger::Logger;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Error callback: `Some(value)` substitutes a result, `None` soft-fails to `Ok(None)`.
pub type ErrorHandler<T> = Box<dyn FnOnce(PulseError) -> Option<T> + Send>;

/// Per-call knobs for [`CacheAside::get_or_compute`].
pub struct CacheAsideOptions<T> {
    /// Lock TTL override; the orchestrator default applies when `None`
    pub lock_ttl_seconds: Option<u64>,
    pub skip_cache: bool,
    pub on_error: Option<ErrorHandler<T>>,
    /// When set, accesses are recorded and the stored TTL is adjusted within these bounds
    pub adaptive_ttl: Option<TtlBounds>,
}

impl<T> Default for CacheAsideOptions<T> {
    fn default() -> Self {
        Self {
            lock_ttl_seconds: None,
            skip_cache: false,
            on_error: None,
            adaptive_ttl: None,
        }
    }
}

impl<T> CacheAsideOptions<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lock_ttl(mut self, seconds: u64) -> Self {
        self.lock_ttl_seconds = Some(seconds);
        self
    }

    pub fn skip_cache(mut self) -> Self {
        self.skip_cache = true;
        self
    }

    pub fn on_error<F>(mut self, handler: F) -> Self
    where
        F: FnOnce(PulseError) -> Option<T> + Send + 'static,
    {
        self.on_error = Some(Box::new(handler));
        self
    }

    pub fn with_adaptive_ttl(mut self, bounds: TtlBounds) -> Self {
        self.adaptive_ttl = Some(bounds);
        self
    }
}

/// Cache-aside orchestrator.
///
/// On a miss only the caller that wins the distributed lock runs `fetch`; the others
/// wait one fixed backoff and re-read. With a healthy lock, N concurrent callers on
/// a cold key cause at most one recompute per miss window.
#[derive(Clone)]
pub struct CacheAside {
    store: Arc<KvStoreAdapter>,
    lock: DistributedLock,
    ttl_estimator: Arc<AdaptiveTtlEstimator>,
    default_lock_ttl: u64,
    lock_wait: Duration,
    logger: Logger,
}

impl CacheAside {
    pub fn new(
        store: Arc<KvStoreAdapter>,
        ttl_estimator: Arc<AdaptiveTtlEstimator>,
        default_lock_ttl: u64,
        lock_wait: Duration,
    ) -> Self {
        Self {
            lock: DistributedLock::new(store.clone()),
            store,
            ttl_estimator,
            default_lock_ttl,
            lock_wait,
            logger: Logger::for_component("cache_aside"),
        }
    }

    pub fn store(&self) -> &Arc<KvStoreAdapter> {
        &self.store
    }

    pub fn ttl_estimator(&self) -> &Arc<AdaptiveTtlEstimator> {
        &self.ttl_estimator
    }

    /// Return the cached value for `key`, or compute it with `fetch` and cache it.
    ///
    /// `Ok(None)` means the call degraded softly: lock contention without a
    /// substitute, or `on_error` declined to provide one.
    pub async fn get_or_compute<T, F, Fut>(
        &self,
        key: &str,
        ttl_seconds: u64,
        fetch: F,
        options: CacheAsideOptions<T>,
    ) -> PulseResult<Option<T>>
    where
        T: Serialize + DeserializeOwned + Send,
        F: FnOnce() -> Fut,
        Fut: Future<Output = PulseResult<T>>,
    {
        let CacheAsideOptions {
            lock_ttl_seconds,
            skip_cache,
            on_error,
            adaptive_ttl,
        } = options;

        if skip_cache || ttl_seconds == 0 {
            return match fetch().await {
                Ok(value) => Ok(Some(value)),
                Err(e) => Self::handle_error(e, on_error),
            };
        }

        if adaptive_ttl.is_some() {
            self.ttl_estimator.record_access(key);
        }

        if let Some(hit) = self.store.get_json::<T>(key).await {
            return Ok(Some(hit));
        }

        let lock_ttl = lock_ttl_seconds.unwrap_or(self.default_lock_ttl);
        if !self.lock.acquire(key, lock_ttl).await {
            tokio::time::sleep(self.lock_wait).await;

            if let Some(hit) = self.store.get_json::<T>(key).await {
                return Ok(Some(hit));
            }

            self.logger.debug_with_meta(
                "Value still missing after lock backoff",
                &serde_json::json!({ "key": key, "wait_ms": self.lock_wait.as_millis() as u64 }),
            );
            return Ok(on_error.and_then(|handler| handler(PulseError::lock_contention(key))));
        }

        match fetch().await {
            Ok(value) => {
                let ttl = match &adaptive_ttl {
                    Some(bounds) => self.ttl_estimator.adjusted_ttl(key, ttl_seconds, bounds),
                    None => ttl_seconds,
                };
                if let Err(e) = self.store.set_json(key, &value, ttl).await {
                    self.logger.warn_with_error(
                        "Computed value could not be encoded for caching",
                        &e,
                        Some(&serde_json::json!({ "key": key })),
                    );
                }
                self.lock.release(key).await;
                Ok(Some(value))
            }
            Err(e) => {
                self.lock.release(key).await;
                self.logger.warn_with_error(
                    "Cache recompute failed",
                    &e,
                    Some(&serde_json::json!({ "key": key })),
                );
                Self::handle_error(e, on_error)
            }
        }
    }

    fn handle_error<T>(error: PulseError, on_error: Option<ErrorHandler<T>>) -> PulseResult<Option<T>> {
        match on_error {
            Some(handler) => Ok(handler(error)),
            None => Err(error),
        }
    }
}
