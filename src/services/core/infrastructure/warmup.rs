//! Cache Warm-Up Scheduler
//!
//! Preloads known-hot keys by priority tier:
//! - `High`: sequential, in the order given
//! - `Medium`: concurrent, awaited before returning
//! - `Low`: spawned in the background and not awaited

use super::kv_store::KvStoreAdapter;
use crate::utils::error::PulseResult;
use crate::utils::logger::Logger;
use futures::future::{join_all, BoxFuture};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Warm-up priority tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarmupPriority {
    High,
    Medium,
    Low,
}

pub type WarmupFetcher = Arc<dyn Fn() -> BoxFuture<'static, PulseResult<Value>> + Send + Sync>;
pub type WarmupCondition = Arc<dyn Fn() -> bool + Send + Sync>;

/// A key to preload and how to compute it.
#[derive(Clone)]
pub struct WarmupItem {
    pub key: String,
    pub fetcher: WarmupFetcher,
    pub ttl_seconds: u64,
    pub priority: WarmupPriority,
    /// Evaluated right before fetching; `false` skips the item
    pub conditional: Option<WarmupCondition>,
}

impl WarmupItem {
    pub fn new<F>(key: impl Into<String>, ttl_seconds: u64, priority: WarmupPriority, fetcher: F) -> Self
    where
        F: Fn() -> BoxFuture<'static, PulseResult<Value>> + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            fetcher: Arc::new(fetcher),
            ttl_seconds,
            priority,
            conditional: None,
        }
    }

    pub fn with_condition<C>(mut self, condition: C) -> Self
    where
        C: Fn() -> bool + Send + Sync + 'static,
    {
        self.conditional = Some(Arc::new(condition));
        self
    }
}

impl fmt::Debug for WarmupItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WarmupItem")
            .field("key", &self.key)
            .field("ttl_seconds", &self.ttl_seconds)
            .field("priority", &self.priority)
            .field("conditional", &self.conditional.is_some())
            .finish()
    }
}

/// Outcome counts of one warm-up pass.
///
/// Low-priority items are counted in `total` and `background` only; their results
/// are logged by the background task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarmupReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub skipped: usize,
    pub background: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WarmupOutcome {
    Stored,
    Failed,
    Skipped,
}

impl WarmupReport {
    fn record(&mut self, outcome: WarmupOutcome) {
        match outcome {
            WarmupOutcome::Stored => self.successful += 1,
            WarmupOutcome::Failed => self.failed += 1,
            WarmupOutcome::Skipped => self.skipped += 1,
        }
    }
}

async fn warm_item(store: Arc<KvStoreAdapter>, logger: Logger, item: WarmupItem) -> WarmupOutcome {
    if let Some(condition) = &item.conditional {
        if !condition() {
            logger.debug_with_meta(
                "Warm-up item skipped by condition",
                &serde_json::json!({ "key": item.key }),
            );
            return WarmupOutcome::Skipped;
        }
    }

    match (item.fetcher)().await {
        Ok(value) => match store.set_json(&item.key, &value, item.ttl_seconds).await {
            Ok(()) => WarmupOutcome::Stored,
            Err(e) => {
                logger.warn_with_error(
                    "Warm-up value could not be encoded",
                    &e,
                    Some(&serde_json::json!({ "key": item.key })),
                );
                WarmupOutcome::Failed
            }
        },
        Err(e) => {
            logger.warn_with_error(
                "Warm-up fetch failed",
                &e,
                Some(&serde_json::json!({ "key": item.key, "priority": item.priority })),
            );
            WarmupOutcome::Failed
        }
    }
}

pub struct WarmupScheduler {
    store: Arc<KvStoreAdapter>,
    logger: Logger,
}

impl WarmupScheduler {
    pub fn new(store: Arc<KvStoreAdapter>) -> Self {
        Self {
            store,
            logger: Logger::for_component("warmup"),
        }
    }

    /// Run one warm-up pass. A failing item never aborts the others.
    pub async fn warmup(&self, items: Vec<WarmupItem>) -> WarmupReport {
        let mut report = WarmupReport {
            total: items.len(),
            ..WarmupReport::default()
        };

        let mut high = Vec::new();
        let mut medium = Vec::new();
        let mut low = Vec::new();
        for item in items {
            match item.priority {
                WarmupPriority::High => high.push(item),
                WarmupPriority::Medium => medium.push(item),
                WarmupPriority::Low => low.push(item),
            }
        }

        for item in high {
            let outcome = warm_item(self.store.clone(), self.logger.clone(), item).await;
            report.record(outcome);
        }

        let outcomes = join_all(
            medium
                .into_iter()
                .map(|item| warm_item(self.store.clone(), self.logger.clone(), item)),
        )
        .await;
        for outcome in outcomes {
            report.record(outcome);
        }

        report.background = low.len();
        for item in low {
            let store = self.store.clone();
            let logger = self.logger.clone();
            tokio::spawn(async move {
                let key = item.key.clone();
                let outcome = warm_item(store, logger.clone(), item).await;
                logger.debug_with_meta(
                    "Background warm-up finished",
                    &serde_json::json!({ "key": key, "outcome": format!("{:?}", outcome) }),
                );
            });
        }

        self.logger.info_with_meta(
            "Cache warm-up pass complete",
            &serde_json::json!({
                "total": report.total,
                "successful": report.successful,
                "failed": report.failed,
                "skipped": report.skipped,
                "background": report.background,
            }),
        );
        report
    }

    /// Re-run [`warmup`](Self::warmup) with the same items every `interval`.
    pub fn spawn_periodic(self: Arc<Self>, items: Vec<WarmupItem>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                self.warmup(items.clone()).await;
            }
        })
    }
}
