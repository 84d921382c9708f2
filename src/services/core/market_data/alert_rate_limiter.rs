use crate::services::core::infrastructure::kv_store::KvStoreAdapter;
use crate::services::core::market_data::alert_engine::{AlertEvent, AlertSeverity};
use crate::utils::kv_standards::{KeyPrefix, KvKeyBuilder};
use crate::utils::logger::Logger;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Suppression window per severity, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertCooldowns {
    pub high_seconds: u64,
    pub medium_seconds: u64,
    pub low_seconds: u64,
}

impl Default for AlertCooldowns {
    fn default() -> Self {
        Self {
            high_seconds: 900,    // 15 minutes
            medium_seconds: 1800, // 30 minutes
            low_seconds: 3600,    // 1 hour
        }
    }
}

impl AlertCooldowns {
    pub fn for_severity(&self, severity: AlertSeverity) -> u64 {
        match severity {
            AlertSeverity::High => self.high_seconds,
            AlertSeverity::Medium => self.medium_seconds,
            AlertSeverity::Low => self.low_seconds,
        }
    }
}

/// Per market and alert type rate limiting on top of the shared store.
///
/// The first event claims `alert_rl:<market>:<type>` with the cooldown as TTL and
/// passes; later events are suppressed until that entry expires. The window is fixed
/// from the claim, so a condition that keeps firing is re-announced once per cooldown.
#[derive(Clone)]
pub struct AlertRateLimiter {
    store: Arc<KvStoreAdapter>,
    cooldowns: AlertCooldowns,
    logger: Logger,
}

impl AlertRateLimiter {
    pub fn new(store: Arc<KvStoreAdapter>, cooldowns: AlertCooldowns) -> Self {
        Self {
            store,
            cooldowns,
            logger: Logger::for_component("alert_rate_limiter"),
        }
    }

    pub fn key_for(event: &AlertEvent) -> String {
        KvKeyBuilder::new(KeyPrefix::AlertRateLimit)
            .add_component(&event.market)
            .add_component(event.alert_type.as_str())
            .build()
    }

    /// Claim the window for `event`. Store failures let the alert through.
    pub async fn allow(&self, event: &AlertEvent) -> bool {
        let key = Self::key_for(event);
        // A zero cooldown would create a window that never closes
        let ttl = self.cooldowns.for_severity(event.severity).max(1);
        match self.store.set_if_absent(&key, "1", ttl).await {
            Ok(claimed) => claimed,
            Err(e) => {
                self.logger.warn_with_error(
                    "Rate limit check failed, letting alert through",
                    &e,
                    Some(&serde_json::json!({ "key": key })),
                );
                true
            }
        }
    }

    /// Give back the windows claimed for `events`, e.g. after a failed delivery,
    /// so the next detection is not suppressed.
    pub async fn release(&self, events: &[AlertEvent]) {
        for event in events {
            self.store.delete(&Self::key_for(event)).await;
        }
    }

    /// Keep only the events allowed through, preserving order.
    pub async fn filter(&self, events: Vec<AlertEvent>) -> Vec<AlertEvent> {
        let mut allowed = Vec::with_capacity(events.len());
        for event in events {
            if self.allow(&event).await {
                allowed.push(event);
            }
        }
        allowed
    }
}
