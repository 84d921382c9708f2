use crate::services::core::infrastructure::adaptive_ttl::{AdaptiveTtlEstimator, TtlBounds};
use crate::services::core::infrastructure::batch_operations::BatchOperations;
use crate::services::core::infrastructure::cache_aside::CacheAside;
use crate::services::core::infrastructure::config::CacheConfig;
use crate::services::core::infrastructure::kv_backend::KvBackend;
use crate::services::core::infrastructure::kv_store::KvStoreAdapter;
use crate::services::core::infrastructure::monitoring::CacheMonitor;
use crate::services::core::infrastructure::redis_backend::RedisBackend;
use crate::services::core::infrastructure::warmup::{WarmupItem, WarmupScheduler};
use crate::utils::logger::Logger;
use crate::utils::PulseResult;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Service container for the cache core.
///
/// Owns one shared [`KvStoreAdapter`] and wires every cache service around it, so
/// nothing relies on module-level globals. Background tasks started here live until
/// [`CacheServices::close`] or drop.
pub struct CacheServices {
    config: CacheConfig,
    store: Arc<KvStoreAdapter>,
    ttl_estimator: Arc<AdaptiveTtlEstimator>,
    cache_aside: CacheAside,
    batch: Arc<BatchOperations>,
    warmup: Arc<WarmupScheduler>,
    monitor: Arc<CacheMonitor>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    logger: Logger,
}

impl CacheServices {
    /// Validate `config`, connect the remote store if one is configured and build the
    /// services. An unreachable remote stays attached and is retried by
    /// later calls; the in-process store serves until it answers.
    pub async fn init(config: CacheConfig) -> PulseResult<Self> {
        config.validate()?;
        let logger = Logger::for_component("cache_services");

        let remote: Option<Arc<dyn KvBackend>> = match &config.redis_url {
            Some(url) => {
                match RedisBackend::new(url, config.connect_timeout(), config.operation_timeout()) {
                    Ok(backend) => {
                        let backend = backend.with_reconnect_backoff(config.reconnect_backoff());
                        match backend.ensure_connected().await {
                            Ok(()) => logger.info("Connected to remote KV store"),
                            Err(e) => logger.warn_with_error(
                                "Remote KV store unreachable, serving from in-process store until it answers",
                                &e,
                                Some(&serde_json::json!({
                                    "connect_timeout_ms": config.connect_timeout_ms,
                                    "reconnect_backoff_ms": config.reconnect_backoff_ms,
                                })),
                            ),
                        }
                        Some(Arc::new(backend))
                    }
                    Err(e) => {
                        logger.warn_with_error("Invalid remote KV url, running local-only", &e, None);
                        None
                    }
                }
            }
            None => None,
        };

        Self::with_backend(config, remote)
    }

    /// Build the services around an explicit backend (or none).
    pub fn with_backend(config: CacheConfig, remote: Option<Arc<dyn KvBackend>>) -> PulseResult<Self> {
        config.validate()?;

        let store = Arc::new(KvStoreAdapter::new(remote, config.environment));
        let ttl_estimator = Arc::new(AdaptiveTtlEstimator::new(config.adaptive_ttl.stale_after_hours));
        let cache_aside = CacheAside::new(
            store.clone(),
            ttl_estimator.clone(),
            config.lock_ttl_seconds,
            config.lock_wait(),
        );

        Ok(Self {
            batch: Arc::new(BatchOperations::new(store.clone())),
            warmup: Arc::new(WarmupScheduler::new(store.clone())),
            monitor: Arc::new(CacheMonitor::new(store.clone())),
            cache_aside,
            ttl_estimator,
            store,
            config,
            tasks: Mutex::new(Vec::new()),
            logger: Logger::for_component("cache_services"),
        })
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<KvStoreAdapter> {
        &self.store
    }

    pub fn cache_aside(&self) -> &CacheAside {
        &self.cache_aside
    }

    pub fn batch(&self) -> &Arc<BatchOperations> {
        &self.batch
    }

    pub fn ttl_estimator(&self) -> &Arc<AdaptiveTtlEstimator> {
        &self.ttl_estimator
    }

    pub fn warmup(&self) -> &Arc<WarmupScheduler> {
        &self.warmup
    }

    pub fn monitor(&self) -> &Arc<CacheMonitor> {
        &self.monitor
    }

    /// Bounds derived from the configured adaptive TTL settings.
    pub fn ttl_bounds(&self) -> TtlBounds {
        TtlBounds::from(&self.config.adaptive_ttl)
    }

    fn track(&self, handle: JoinHandle<()>) {
        match self.tasks.lock() {
            Ok(mut tasks) => tasks.push(handle),
            Err(_) => handle.abort(),
        }
    }

    pub fn background_task_count(&self) -> usize {
        self.tasks
            .lock()
            .map(|tasks| tasks.iter().filter(|t| !t.is_finished()).count())
            .unwrap_or(0)
    }

    /// Start the access-stat sweeper, the fallback purge and the periodic health check.
    pub fn start_background_tasks(&self) {
        let sweep_interval = Duration::from_secs(self.config.adaptive_ttl.sweep_interval_seconds);
        self.track(self.ttl_estimator.clone().spawn_sweeper(sweep_interval));

        let store = self.store.clone();
        let logger = self.logger.clone();
        self.track(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let purged = store.fallback().purge_expired();
                if purged > 0 {
                    logger.debug_with_meta(
                        "Purged expired fallback entries",
                        &serde_json::json!({ "purged": purged }),
                    );
                }
            }
        }));

        let monitor_interval = Duration::from_secs(self.config.monitor_interval_seconds);
        self.track(self.monitor.clone().spawn_periodic(monitor_interval));

        self.logger.info_with_meta(
            "Cache background tasks started",
            &serde_json::json!({
                "sweep_interval_seconds": self.config.adaptive_ttl.sweep_interval_seconds,
                "monitor_interval_seconds": self.config.monitor_interval_seconds,
            }),
        );
    }

    /// Re-run warm-up for `items` every `interval`, tracked with the other background tasks.
    pub fn schedule_warmup(&self, items: Vec<WarmupItem>, interval: Duration) {
        self.track(self.warmup.clone().spawn_periodic(items, interval));
    }

    /// Abort every background task started through this container.
    pub fn close(&self) {
        let handles: Vec<JoinHandle<()>> = match self.tasks.lock() {
            Ok(mut tasks) => tasks.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        let count = handles.len();
        for handle in handles {
            handle.abort();
        }
        if count > 0 {
            self.logger
                .info_with_meta("Cache background tasks stopped", &serde_json::json!({ "tasks": count }));
        }
    }
}

impl Drop for CacheServices {
    fn drop(&mut self) {
        self.close();
    }
}
