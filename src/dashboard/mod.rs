// src/dashboard/mod.rs
//! Read/write view over a [`RecoveryService`].
//!
//! The dashboard keeps the last snapshot it read and re-reads after every
//! write. Writes are refused unless the view was built for an admin.

pub mod poller;

pub use poller::DashboardPoller;

use crate::app_log;
use crate::recovery::{
    BreakerState, CircuitBreakerState, ErrorKind, FallbackStrategy, HealthStatus, RecoveryService,
    StrategyUpdate,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const IMPORT_FAILED: &str = "Failed to import configuration. Check the format and try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TileTone {
    Healthy,
    Warning,
    Critical,
}

impl TileTone {
    pub fn color(&self) -> &'static str {
        match self {
            TileTone::Healthy => "green",
            TileTone::Warning => "yellow",
            TileTone::Critical => "red",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryTile {
    pub title: String,
    pub value: String,
    pub status: String,
    pub tone: TileTone,
    pub color: &'static str,
}

impl SummaryTile {
    fn new(title: &str, value: impl ToString, status: &str, tone: TileTone) -> Self {
        Self {
            title: title.to_string(),
            value: value.to_string(),
            status: status.to_string(),
            tone,
            color: tone.color(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakerView {
    pub operation: String,
    pub state: BreakerState,
    pub failure_count: u32,
    pub last_failure_time: Option<DateTime<Utc>>,
    pub next_attempt_time: Option<DateTime<Utc>>,
    /// "reset in 45s", only while the breaker is open.
    pub reset_in: Option<String>,
}

impl BreakerView {
    fn from_state(operation: &str, breaker: &CircuitBreakerState, now: DateTime<Utc>) -> Self {
        let reset_in = match (breaker.state, breaker.next_attempt_time) {
            (BreakerState::Open, Some(next)) => {
                Some(format!("reset in {}", countdown_label(next, now)))
            }
            _ => None,
        };

        Self {
            operation: operation.to_string(),
            state: breaker.state,
            failure_count: breaker.failure_count,
            last_failure_time: breaker.last_failure_time,
            next_attempt_time: breaker.next_attempt_time,
            reset_in,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub health: Option<HealthStatus>,
    pub breakers: Vec<BreakerView>,
    pub strategies: Vec<FallbackStrategy>,
    pub refreshed_at: Option<DateTime<Utc>>,
}

/// Compact status badge for page headers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusWidget {
    pub tone: TileTone,
    pub label: String,
    pub open_breakers: usize,
    pub offline_mode: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum AdminOutcome<T = ()> {
    Applied(T),
    /// Not an admin view; the engine was not called.
    Denied,
    /// The engine refused. `input` is handed back so it can be retried.
    Failed { input: String, message: String },
}

impl<T> AdminOutcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, AdminOutcome::Applied(_))
    }
}

/// Time until `next_attempt`, as shown next to an open breaker.
pub fn countdown_label(next_attempt: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (next_attempt - now).num_seconds();
    if seconds <= 0 {
        "Now".to_string()
    } else if seconds < 60 {
        format!("{}s", seconds)
    } else {
        format!("{}m", seconds / 60)
    }
}

pub struct RecoveryDashboard {
    service: Arc<dyn RecoveryService>,
    is_admin: bool,
    snapshot: Arc<Mutex<DashboardSnapshot>>,
}

impl RecoveryDashboard {
    pub fn new(service: Arc<dyn RecoveryService>, is_admin: bool) -> Self {
        Self {
            service,
            is_admin,
            snapshot: Arc::new(Mutex::new(DashboardSnapshot::default())),
        }
    }

    /// Another view over the same service and snapshot.
    pub fn with_admin(&self, is_admin: bool) -> Self {
        Self {
            service: self.service.clone(),
            is_admin,
            snapshot: self.snapshot.clone(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn refresh(&self) -> DashboardSnapshot {
        let now = Utc::now();
        let health = self.service.get_health_status();
        let breakers = self
            .service
            .get_circuit_breaker_status()
            .iter()
            .map(|(operation, breaker)| BreakerView::from_state(operation, breaker, now))
            .collect();
        let mut strategies = self.service.get_fallback_strategies();
        strategies.sort_by_key(|s| s.priority);

        let snapshot = DashboardSnapshot {
            health: Some(health),
            breakers,
            strategies,
            refreshed_at: Some(now),
        };
        *self.lock() = snapshot.clone();
        snapshot
    }

    /// Last snapshot read, at most one poll interval old.
    pub fn snapshot(&self) -> DashboardSnapshot {
        self.lock().clone()
    }

    pub fn summary_tiles(&self) -> Vec<SummaryTile> {
        summary_tiles(&self.snapshot())
    }

    pub fn status_widget(&self) -> StatusWidget {
        status_widget(&self.snapshot())
    }

    pub fn reset_circuit_breaker(&self, operation: &str) -> AdminOutcome {
        self.admin(|service| {
            service.reset_circuit_breaker(operation);
            AdminOutcome::Applied(())
        })
    }

    pub fn force_open_circuit_breaker(&self, operation: &str) -> AdminOutcome {
        self.admin(|service| {
            service.force_open_circuit_breaker(operation);
            AdminOutcome::Applied(())
        })
    }

    pub fn simulate_error(&self, operation: &str, kind: ErrorKind) -> AdminOutcome {
        self.admin(|service| {
            service.simulate_error(operation, kind);
            AdminOutcome::Applied(())
        })
    }

    pub fn update_fallback_strategy(
        &self,
        name: &str,
        enabled: bool,
    ) -> AdminOutcome<FallbackStrategy> {
        self.admin(|service| {
            match service.update_fallback_strategy(name, StrategyUpdate::enabled(enabled)) {
                Ok(strategy) => AdminOutcome::Applied(strategy),
                Err(e) => AdminOutcome::Failed {
                    input: name.to_string(),
                    message: e.to_string(),
                },
            }
        })
    }

    pub fn clear_fallback_cache(&self) -> AdminOutcome<usize> {
        self.admin(|service| AdminOutcome::Applied(service.clear_fallback_cache()))
    }

    pub fn export_config(&self) -> AdminOutcome<String> {
        self.admin(|service| match service.export_config() {
            Ok(config) => AdminOutcome::Applied(config),
            Err(e) => AdminOutcome::Failed {
                input: String::new(),
                message: e.to_string(),
            },
        })
    }

    pub fn import_config(&self, config: &str) -> AdminOutcome {
        self.admin(|service| {
            if service.import_config(config) {
                AdminOutcome::Applied(())
            } else {
                AdminOutcome::Failed {
                    input: config.to_string(),
                    message: IMPORT_FAILED.to_string(),
                }
            }
        })
    }

    fn admin<T>(&self, action: impl FnOnce(&dyn RecoveryService) -> AdminOutcome<T>) -> AdminOutcome<T> {
        if !self.is_admin {
            app_log!(warn, "Recovery admin action refused for non-admin view");
            return AdminOutcome::Denied;
        }
        let outcome = action(self.service.as_ref());
        self.refresh();
        outcome
    }

    fn lock(&self) -> MutexGuard<'_, DashboardSnapshot> {
        self.snapshot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

pub fn summary_tiles(snapshot: &DashboardSnapshot) -> Vec<SummaryTile> {
    let Some(health) = &snapshot.health else {
        return Vec::new();
    };

    let open = health.open_circuit_breakers.len();
    let breakers = if open > 0 {
        SummaryTile::new("Circuit Breakers", open, "Open", TileTone::Critical)
    } else {
        SummaryTile::new("Circuit Breakers", open, "Healthy", TileTone::Healthy)
    };

    let failures = if health.total_failures > 0 {
        SummaryTile::new("Total Failures", health.total_failures, "Failing", TileTone::Warning)
    } else {
        SummaryTile::new("Total Failures", 0, "None", TileTone::Healthy)
    };

    let strategies = SummaryTile::new(
        "Active Strategies",
        health.active_fallback_strategies.len(),
        "Enabled",
        TileTone::Healthy,
    );

    let offline = if health.offline_mode {
        SummaryTile::new("Mode", "Offline", "Degraded", TileTone::Critical)
    } else {
        SummaryTile::new("Mode", "Online", "Normal", TileTone::Healthy)
    };

    vec![breakers, failures, strategies, offline]
}

pub fn status_widget(snapshot: &DashboardSnapshot) -> StatusWidget {
    let (open_breakers, offline_mode, half_open) = snapshot
        .health
        .as_ref()
        .map(|h| {
            (
                h.open_circuit_breakers.len(),
                h.offline_mode,
                !h.half_open_circuit_breakers.is_empty(),
            )
        })
        .unwrap_or((0, false, false));

    let (tone, label) = if open_breakers > 0 || offline_mode {
        (TileTone::Critical, "Service issues")
    } else if half_open {
        (TileTone::Warning, "Recovering")
    } else {
        (TileTone::Healthy, "All systems operational")
    };

    StatusWidget {
        tone,
        label: label.to_string(),
        open_breakers,
        offline_mode,
    }
}
