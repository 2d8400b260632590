// src/dashboard/poller.rs
use super::RecoveryDashboard;
use crate::app_log;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Refreshes a dashboard on a fixed period until dropped.
pub struct DashboardPoller {
    handle: JoinHandle<()>,
}

impl DashboardPoller {
    /// Must be called inside a tokio runtime. The first refresh happens immediately.
    pub fn spawn(dashboard: Arc<RecoveryDashboard>, period: Duration) -> Self {
        app_log!(info, "Starting recovery dashboard poller every {:?}", period);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                dashboard.refresh();
            }
        });

        Self { handle }
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

impl Drop for DashboardPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
