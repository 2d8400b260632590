// src/recovery/fallback.rs
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

pub const CACHED_DATA: &str = "cached_data";
pub const RETRY_WITH_BACKOFF: &str = "retry_with_backoff";
pub const MANUAL_ENTRY: &str = "manual_entry";
pub const OFFLINE_MODE: &str = "offline_mode";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackStrategy {
    pub name: String,
    pub description: String,
    pub enabled: bool,
    /// Lower runs first.
    #[serde(default)]
    pub priority: u8,
}

impl FallbackStrategy {
    fn new(name: &str, description: &str, priority: u8) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            enabled: true,
            priority,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StrategyUpdate {
    pub enabled: Option<bool>,
    pub priority: Option<u8>,
}

impl StrategyUpdate {
    pub fn enabled(enabled: bool) -> Self {
        Self {
            enabled: Some(enabled),
            priority: None,
        }
    }

    pub fn apply(&self, strategy: &mut FallbackStrategy) {
        if let Some(enabled) = self.enabled {
            strategy.enabled = enabled;
        }
        if let Some(priority) = self.priority {
            strategy.priority = priority;
        }
    }
}

pub fn default_strategies() -> Vec<FallbackStrategy> {
    vec![
        FallbackStrategy::new(
            CACHED_DATA,
            "Serve the last successful response while the service is unavailable",
            1,
        ),
        FallbackStrategy::new(
            RETRY_WITH_BACKOFF,
            "Retry failed requests with exponential backoff",
            2,
        ),
        FallbackStrategy::new(
            MANUAL_ENTRY,
            "Ask the user to paste the content manually",
            3,
        ),
        FallbackStrategy::new(
            OFFLINE_MODE,
            "Disable network-backed features while breakers are open",
            4,
        ),
    ]
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    stored_at: DateTime<Utc>,
}

/// Last-known-good responses keyed by request, with a fixed time-to-live.
#[derive(Debug, Clone)]
pub struct FallbackCache {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
}

impl FallbackCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Option<&Value> {
        self.entries
            .get(key)
            .filter(|entry| now - entry.stored_at < self.ttl)
            .map(|entry| &entry.value)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value, now: DateTime<Utc>) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                stored_at: now,
            },
        );
    }

    pub fn purge_expired(&mut self, now: DateTime<Utc>) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| now - entry.stored_at < ttl);
    }

    pub fn clear(&mut self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn set_ttl(&mut self, ttl: Duration) {
        self.ttl = ttl;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_strategies_are_enabled_and_ordered() {
        let strategies = default_strategies();
        assert_eq!(strategies.len(), 4);
        assert!(strategies.iter().all(|s| s.enabled));
        assert!(strategies.windows(2).all(|w| w[0].priority < w[1].priority));
    }

    #[test]
    fn test_update_only_touches_given_fields() {
        let mut strategy = default_strategies().remove(0);
        StrategyUpdate::enabled(false).apply(&mut strategy);
        assert!(!strategy.enabled);
        assert_eq!(strategy.priority, 1);
    }

    #[test]
    fn test_cache_expiry() {
        let now = Utc::now();
        let mut cache = FallbackCache::new(Duration::seconds(60));
        cache.insert("jobs:1", json!({"title": "Engineer"}), now);

        assert!(cache.get("jobs:1", now + Duration::seconds(59)).is_some());
        assert!(cache.get("jobs:1", now + Duration::seconds(60)).is_none());

        cache.purge_expired(now + Duration::seconds(61));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_cache_clear_reports_count() {
        let now = Utc::now();
        let mut cache = FallbackCache::new(Duration::hours(1));
        cache.insert("a", json!(1), now);
        cache.insert("b", json!(2), now);
        assert_eq!(cache.clear(), 2);
        assert_eq!(cache.len(), 0);
    }
}
