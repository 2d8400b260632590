// src/recovery/engine.rs
use super::circuit_breaker::{BreakerPolicy, BreakerState, CircuitBreakerState, ErrorKind};
use super::fallback::{FallbackCache, FallbackStrategy, StrategyUpdate, CACHED_DATA, OFFLINE_MODE};
use super::{RecoveryConfig, RecoveryService, MAX_WINDOW_SECS};
use crate::app_log;
use crate::error::{RecoveryError, RecoveryResult};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub open_circuit_breakers: Vec<String>,
    pub half_open_circuit_breakers: Vec<String>,
    pub total_failures: u32,
    pub active_fallback_strategies: Vec<String>,
    pub offline_mode: bool,
    pub cached_entries: usize,
    pub checked_at: DateTime<Utc>,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.open_circuit_breakers.is_empty() && !self.offline_mode
    }
}

/// Maps a caller's error onto the failure kinds the breakers understand.
pub trait ClassifyError {
    fn error_kind(&self) -> ErrorKind;
}

#[derive(Debug)]
pub enum GuardError<E> {
    /// Call skipped: breaker open and nothing usable in the fallback cache.
    CircuitOpen {
        operation: String,
        retry_at: Option<DateTime<Utc>>,
    },
    Failed(E),
}

impl<E: fmt::Display> fmt::Display for GuardError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardError::CircuitOpen { operation, .. } => {
                write!(f, "circuit breaker open for operation: {}", operation)
            }
            GuardError::Failed(e) => write!(f, "{}", e),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExportedConfig {
    version: u32,
    #[serde(default)]
    exported_at: Option<DateTime<Utc>>,
    failure_threshold: u32,
    success_threshold: u32,
    reset_timeout_secs: u64,
    cache_ttl_secs: u64,
    fallback_strategies: Vec<FallbackStrategy>,
    #[serde(default)]
    circuit_breakers: BTreeMap<String, CircuitBreakerState>,
}

impl ExportedConfig {
    fn validate(&self) -> RecoveryResult<()> {
        if self.version != CONFIG_VERSION {
            return Err(RecoveryError::InvalidConfig(format!(
                "unsupported version {}",
                self.version
            )));
        }
        if self.failure_threshold == 0 || self.success_threshold == 0 {
            return Err(RecoveryError::InvalidConfig(
                "thresholds must be at least 1".to_string(),
            ));
        }
        for (field, secs) in [
            ("resetTimeoutSecs", self.reset_timeout_secs),
            ("cacheTtlSecs", self.cache_ttl_secs),
        ] {
            if secs > MAX_WINDOW_SECS {
                return Err(RecoveryError::InvalidConfig(format!(
                    "{} must not exceed {} seconds",
                    field, MAX_WINDOW_SECS
                )));
            }
        }
        let mut seen = HashSet::new();
        for strategy in &self.fallback_strategies {
            if strategy.name.trim().is_empty() || !seen.insert(strategy.name.as_str()) {
                return Err(RecoveryError::InvalidConfig(format!(
                    "duplicate or empty strategy name: '{}'",
                    strategy.name
                )));
            }
        }
        Ok(())
    }
}

struct EngineState {
    config: RecoveryConfig,
    breakers: BTreeMap<String, CircuitBreakerState>,
    cache: FallbackCache,
}

impl EngineState {
    fn policy(&self) -> BreakerPolicy {
        self.config.policy()
    }

    fn breaker(&mut self, operation: &str) -> &mut CircuitBreakerState {
        self.breakers.entry(operation.to_string()).or_default()
    }

    fn strategy_enabled(&self, name: &str) -> bool {
        self.config
            .strategies
            .iter()
            .any(|s| s.name == name && s.enabled)
    }
}

/// Owned recovery engine. Share it behind an `Arc`; every method takes `&self`.
pub struct RecoveryEngine {
    state: Mutex<EngineState>,
}

impl Default for RecoveryEngine {
    fn default() -> Self {
        Self::new(RecoveryConfig::default())
    }
}

impl RecoveryEngine {
    pub fn new(config: RecoveryConfig) -> Self {
        let breakers = config
            .operations
            .iter()
            .map(|op| (op.clone(), CircuitBreakerState::new()))
            .collect();
        let cache = FallbackCache::new(config.cache_ttl());

        Self {
            state: Mutex::new(EngineState {
                config,
                breakers,
                cache,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn can_execute(&self, operation: &str) -> bool {
        self.lock().breaker(operation).try_acquire(Utc::now())
    }

    pub fn record_success(&self, operation: &str) {
        let mut state = self.lock();
        let policy = state.policy();
        state.breaker(operation).on_success(&policy);
    }

    pub fn record_failure(&self, operation: &str, kind: ErrorKind) {
        let mut state = self.lock();
        let policy = state.policy();
        let breaker = state.breaker(operation);
        breaker.on_failure(&policy, kind, Utc::now());

        if breaker.is_open() {
            app_log!(
                warn,
                "Circuit breaker open for {} after {} failures ({:?})",
                operation,
                breaker.failure_count,
                kind
            );
        }
    }

    fn cached<T: DeserializeOwned>(&self, cache_key: &str) -> Option<T> {
        let state = self.lock();
        if !state.strategy_enabled(CACHED_DATA) {
            return None;
        }
        state
            .cache
            .get(cache_key, Utc::now())
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }

    /// Runs `call` under the breaker for `operation`.
    ///
    /// Successful results are stored under `cache_key`; while the breaker is
    /// open, or when the call fails, a fresh cached value is served instead
    /// if the `cached_data` strategy is enabled.
    pub async fn execute<T, E, Fut>(
        &self,
        operation: &str,
        cache_key: &str,
        call: Fut,
    ) -> Result<T, GuardError<E>>
    where
        T: Serialize + DeserializeOwned,
        E: ClassifyError + fmt::Display,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.can_execute(operation) {
            if let Some(value) = self.cached(cache_key) {
                app_log!(info, "Serving cached result for {} ({})", operation, cache_key);
                return Ok(value);
            }
            let retry_at = self.lock().breaker(operation).next_attempt_time;
            return Err(GuardError::CircuitOpen {
                operation: operation.to_string(),
                retry_at,
            });
        }

        match call.await {
            Ok(value) => {
                self.record_success(operation);
                let mut state = self.lock();
                if state.strategy_enabled(CACHED_DATA) {
                    if let Ok(json) = serde_json::to_value(&value) {
                        state.cache.insert(cache_key, json, Utc::now());
                    }
                }
                Ok(value)
            }
            Err(e) => {
                app_log!(warn, "Guarded operation {} failed: {}", operation, e);
                self.record_failure(operation, e.error_kind());
                match self.cached(cache_key) {
                    Some(value) => Ok(value),
                    None => Err(GuardError::Failed(e)),
                }
            }
        }
    }

    fn export(&self) -> ExportedConfig {
        let state = self.lock();
        ExportedConfig {
            version: CONFIG_VERSION,
            exported_at: Some(Utc::now()),
            failure_threshold: state.config.failure_threshold,
            success_threshold: state.config.success_threshold,
            reset_timeout_secs: state.config.reset_timeout_secs,
            cache_ttl_secs: state.config.cache_ttl_secs,
            fallback_strategies: state.config.strategies.clone(),
            circuit_breakers: state.breakers.clone(),
        }
    }

    fn import(&self, raw: &str) -> RecoveryResult<()> {
        let imported: ExportedConfig = serde_json::from_str(raw)?;
        imported.validate()?;

        let mut state = self.lock();
        let config = RecoveryConfig {
            failure_threshold: imported.failure_threshold,
            success_threshold: imported.success_threshold,
            reset_timeout_secs: imported.reset_timeout_secs,
            cache_ttl_secs: imported.cache_ttl_secs,
            strategies: imported.fallback_strategies,
            ..state.config.clone()
        };
        let ttl = config.cache_ttl();

        state.config = config;
        state.cache.set_ttl(ttl);
        state.breakers.extend(imported.circuit_breakers);
        Ok(())
    }
}

impl RecoveryService for RecoveryEngine {
    fn get_health_status(&self) -> HealthStatus {
        let mut state = self.lock();
        let now = Utc::now();
        state.cache.purge_expired(now);

        let names_in = |wanted: BreakerState| -> Vec<String> {
            state
                .breakers
                .iter()
                .filter(|(_, b)| b.state == wanted)
                .map(|(op, _)| op.clone())
                .collect()
        };
        let open_circuit_breakers = names_in(BreakerState::Open);
        let half_open_circuit_breakers = names_in(BreakerState::HalfOpen);

        let mut active: Vec<&FallbackStrategy> =
            state.config.strategies.iter().filter(|s| s.enabled).collect();
        active.sort_by_key(|s| s.priority);

        let offline_mode =
            state.strategy_enabled(OFFLINE_MODE) && !open_circuit_breakers.is_empty();

        HealthStatus {
            total_failures: state
                .breakers
                .values()
                .fold(0u32, |total, b| total.saturating_add(b.failure_count)),
            active_fallback_strategies: active.into_iter().map(|s| s.name.clone()).collect(),
            offline_mode,
            cached_entries: state.cache.len(),
            open_circuit_breakers,
            half_open_circuit_breakers,
            checked_at: now,
        }
    }

    fn get_circuit_breaker_status(&self) -> BTreeMap<String, CircuitBreakerState> {
        self.lock().breakers.clone()
    }

    fn get_fallback_strategies(&self) -> Vec<FallbackStrategy> {
        self.lock().config.strategies.clone()
    }

    fn reset_circuit_breaker(&self, operation: &str) {
        self.lock().breaker(operation).reset();
        app_log!(info, "Circuit breaker reset: {}", operation);
    }

    fn force_open_circuit_breaker(&self, operation: &str) {
        let mut state = self.lock();
        let policy = state.policy();
        state.breaker(operation).trip(&policy, Utc::now());
        app_log!(warn, "Circuit breaker forced open: {}", operation);
    }

    fn simulate_error(&self, operation: &str, kind: ErrorKind) {
        app_log!(info, "Simulating {:?} error for {}", kind, operation);
        self.record_failure(operation, kind);
    }

    fn update_fallback_strategy(
        &self,
        name: &str,
        update: StrategyUpdate,
    ) -> RecoveryResult<FallbackStrategy> {
        let mut state = self.lock();
        let strategy = state
            .config
            .strategies
            .iter_mut()
            .find(|s| s.name == name)
            .ok_or_else(|| RecoveryError::UnknownStrategy(name.to_string()))?;

        update.apply(strategy);
        app_log!(
            info,
            "Fallback strategy {} updated (enabled: {})",
            name,
            strategy.enabled
        );
        Ok(strategy.clone())
    }

    fn clear_fallback_cache(&self) -> usize {
        let cleared = self.lock().cache.clear();
        app_log!(info, "Fallback cache cleared ({} entries)", cleared);
        cleared
    }

    fn export_config(&self) -> RecoveryResult<String> {
        Ok(serde_json::to_string_pretty(&self.export())?)
    }

    fn import_config(&self, config: &str) -> bool {
        match self.import(config) {
            Ok(()) => {
                app_log!(info, "Recovery configuration imported");
                true
            }
            Err(e) => {
                app_log!(warn, "Recovery configuration import rejected: {}", e);
                false
            }
        }
    }
}
