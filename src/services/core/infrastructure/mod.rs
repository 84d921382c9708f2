// src/services/core/infrastructure/mod.rs

//! Cache Infrastructure Module
//!
//! Stampede-safe caching over a shared KV store:
//! 1. **KV Store Adapter** - remote-first, in-process fallback, never surfaces transport errors
//! 2. **Distributed Lock** - `lock:<key>` create-if-absent entries, fail-open
//! 3. **Cache-Aside** - single-flight recompute on miss
//! 4. **Batch Operations** - pipelined multi-key calls, partial results on bad entries
//! 5. **Adaptive TTL** - access-rate based TTL stretching and shrinking
//! 6. **Warm-Up** - prioritized preloading
//! 7. **Monitoring** - store health snapshots and threshold warnings
//!
//! Everything is wired through [`CacheServices`].

pub mod adaptive_ttl;
pub mod batch_operations;
pub mod cache_aside;
pub mod config;
pub mod distributed_lock;
pub mod kv_backend;
pub mod kv_store;
pub mod memory_store;
pub mod monitoring;
pub mod redis_backend;
pub mod service_container;
pub mod warmup;

pub use adaptive_ttl::{AccessStat, AdaptiveTtlEstimator, TtlBounds};
pub use batch_operations::{BatchOperations, BatchSetEntry};
pub use cache_aside::{CacheAside, CacheAsideOptions, ErrorHandler};
pub use config::{AdaptiveTtlConfig, CacheConfig, Environment};
pub use distributed_lock::DistributedLock;
pub use kv_backend::{BatchEntry, KvBackend};
pub use kv_store::{AdapterStats, KvStoreAdapter};
pub use memory_store::MemoryKvStore;
pub use monitoring::{CacheMonitor, HealthWarning, MonitorThresholds, StoreHealthSnapshot};
pub use redis_backend::RedisBackend;
pub use service_container::CacheServices;
pub use warmup::{WarmupItem, WarmupPriority, WarmupReport, WarmupScheduler};
