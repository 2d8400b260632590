//! Job-application intake and error-recovery dashboard service.
//!
//! The intake panel turns uploaded files, URLs and pasted text into
//! structured job data. The recovery dashboard watches the circuit breakers
//! and fallback strategies that guard calls to the professional-network
//! service.

/// Crate-wide logging macro, forwards to the matching `tracing` level.
#[macro_export]
macro_rules! app_log {
    (trace, $($arg:tt)+) => { ::tracing::trace!($($arg)+) };
    (debug, $($arg:tt)+) => { ::tracing::debug!($($arg)+) };
    (info, $($arg:tt)+) => { ::tracing::info!($($arg)+) };
    (warn, $($arg:tt)+) => { ::tracing::warn!($($arg)+) };
    (error, $($arg:tt)+) => { ::tracing::error!($($arg)+) };
}

pub mod auth;
pub mod cli;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod intake;
pub mod recovery;
pub mod types;
pub mod utils;
pub mod web;

pub use config::AppConfig;
pub use dashboard::{DashboardPoller, RecoveryDashboard};
pub use intake::{IntakePanel, IntakeSink};
pub use recovery::{RecoveryEngine, RecoveryService};
pub use web::{build_rocket, start_web_server};
