// src/web/services.rs
use crate::app_log;
use crate::auth::AuthConfig;
use crate::config::AppConfig;
use crate::dashboard::RecoveryDashboard;
use crate::intake::{
    CollectingSink, HeuristicParser, HttpTextExtractor, IntakePanel, JobDescriptionParser,
    TextExtractor,
};
use crate::recovery::RecoveryEngine;
use anyhow::Result;
use std::sync::Arc;

/// Collaborators shared by every intake request. Each request gets its own panel.
pub struct IntakeServices {
    pub parser: Arc<dyn JobDescriptionParser>,
    pub extractor: Arc<dyn TextExtractor>,
    pub max_file_size: u64,
}

impl IntakeServices {
    pub fn panel(&self) -> (IntakePanel, Arc<CollectingSink>) {
        let sink = Arc::new(CollectingSink::default());
        let panel = IntakePanel::new(self.parser.clone(), self.extractor.clone(), sink.clone())
            .with_max_file_size(self.max_file_size);
        (panel, sink)
    }
}

/// The engine plus the two polled views over it.
pub struct RecoveryViews {
    pub engine: Arc<RecoveryEngine>,
    /// Full dashboard, refreshed every `dashboard.poll_interval_secs`.
    pub dashboard: Arc<RecoveryDashboard>,
    /// Header widget, refreshed every `dashboard.compact_poll_interval_secs`.
    pub status: Arc<RecoveryDashboard>,
}

impl RecoveryViews {
    pub fn new(engine: Arc<RecoveryEngine>) -> Self {
        Self {
            dashboard: Arc::new(RecoveryDashboard::new(engine.clone(), false)),
            status: Arc::new(RecoveryDashboard::new(engine.clone(), false)),
            engine,
        }
    }
}

pub struct AppState {
    pub intake: IntakeServices,
    pub recovery: RecoveryViews,
    pub auth: AuthConfig,
}

impl AppState {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let engine = Arc::new(RecoveryEngine::new(config.recovery.clone()));
        let extractor = HttpTextExtractor::new(&config.extraction)?.with_recovery(engine.clone());
        Ok(Self::new(
            IntakeServices {
                parser: Arc::new(HeuristicParser::new()),
                extractor: Arc::new(extractor),
                max_file_size: config.extraction.max_file_size,
            },
            engine,
            AuthConfig::new(&config.auth),
        ))
    }

    pub fn new(intake: IntakeServices, engine: Arc<RecoveryEngine>, auth: AuthConfig) -> Self {
        if !auth.is_enabled() {
            app_log!(warn, "ADMIN_JWT_SECRET not set, recovery admin routes are closed");
        }
        Self {
            intake,
            recovery: RecoveryViews::new(engine),
            auth,
        }
    }
}
