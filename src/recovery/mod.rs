// src/recovery/mod.rs
//! Error recovery for calls to the professional-network service: per-operation
//! circuit breakers, a registry of fallback strategies and a fallback cache.

pub mod circuit_breaker;
pub mod engine;
pub mod fallback;

pub use circuit_breaker::{BreakerPolicy, BreakerState, CircuitBreakerState, ErrorKind};
pub use engine::{ClassifyError, GuardError, HealthStatus, RecoveryEngine};
pub use fallback::{FallbackCache, FallbackStrategy, StrategyUpdate};

use crate::error::RecoveryResult;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Operations pre-registered with a closed breaker.
pub const DEFAULT_OPERATIONS: [&str; 3] = ["linkedin_profile", "linkedin_jobs", "linkedin_search"];

/// Longest accepted reset timeout or cache TTL (30 days).
pub const MAX_WINDOW_SECS: u64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecoveryConfig {
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub reset_timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub operations: Vec<String>,
    pub strategies: Vec<FallbackStrategy>,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 1,
            reset_timeout_secs: 60,
            cache_ttl_secs: 3600,
            operations: DEFAULT_OPERATIONS.iter().map(|op| op.to_string()).collect(),
            strategies: fallback::default_strategies(),
        }
    }
}

impl RecoveryConfig {
    pub fn policy(&self) -> BreakerPolicy {
        BreakerPolicy {
            failure_threshold: self.failure_threshold.max(1),
            success_threshold: self.success_threshold.max(1),
            reset_timeout: window(self.reset_timeout_secs),
        }
    }

    pub fn cache_ttl(&self) -> chrono::Duration {
        window(self.cache_ttl_secs)
    }
}

fn window(secs: u64) -> chrono::Duration {
    chrono::Duration::seconds(secs.min(MAX_WINDOW_SECS) as i64)
}

/// Read/write surface of the recovery engine, as consumed by the dashboard.
///
/// Reads are side-effect free snapshots. Writes take effect immediately.
pub trait RecoveryService: Send + Sync {
    fn get_health_status(&self) -> HealthStatus;

    fn get_circuit_breaker_status(&self) -> BTreeMap<String, CircuitBreakerState>;

    fn get_fallback_strategies(&self) -> Vec<FallbackStrategy>;

    fn reset_circuit_breaker(&self, operation: &str);

    fn force_open_circuit_breaker(&self, operation: &str);

    fn simulate_error(&self, operation: &str, kind: ErrorKind);

    fn update_fallback_strategy(
        &self,
        name: &str,
        update: StrategyUpdate,
    ) -> RecoveryResult<FallbackStrategy>;

    /// Returns the number of evicted entries.
    fn clear_fallback_cache(&self) -> usize;

    fn export_config(&self) -> RecoveryResult<String>;

    /// All-or-nothing; `false` leaves the engine untouched.
    fn import_config(&self, config: &str) -> bool;
}
