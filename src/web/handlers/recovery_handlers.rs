// src/web/handlers/recovery_handlers.rs
use crate::app_log;
use crate::auth::OptionalAdmin;
use crate::dashboard::{AdminOutcome, RecoveryDashboard, StatusWidget};
use crate::recovery::{CircuitBreakerState, ErrorKind, HealthStatus, RecoveryService};
use crate::web::services::RecoveryViews;
use crate::web::types::{
    api_error, ActionResponse, ApiError, DashboardView, DataResponse, ImportConfigRequest,
    SimulateErrorRequest, StandardRequest, StrategyToggleRequest, WithConversationId,
};
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use std::collections::BTreeMap;
use std::str::FromStr;

pub async fn recovery_health_handler(
    recovery: &State<RecoveryViews>,
) -> Json<DataResponse<HealthStatus>> {
    let health = recovery.engine.get_health_status();
    let message = if health.is_healthy() {
        "All circuit breakers closed".to_string()
    } else {
        format!(
            "{} circuit breaker(s) open",
            health.open_circuit_breakers.len()
        )
    };
    Json(DataResponse::success(message, health, None))
}

pub async fn recovery_breakers_handler(
    recovery: &State<RecoveryViews>,
) -> Json<DataResponse<BTreeMap<String, CircuitBreakerState>>> {
    let breakers = recovery.engine.get_circuit_breaker_status();
    Json(DataResponse::success(
        format!("{} circuit breakers", breakers.len()),
        breakers,
        None,
    ))
}

pub async fn recovery_dashboard_handler(
    refresh: bool,
    recovery: &State<RecoveryViews>,
) -> Json<DataResponse<DashboardView>> {
    let dashboard = &recovery.dashboard;
    let snapshot = if refresh || dashboard.snapshot().refreshed_at.is_none() {
        dashboard.refresh()
    } else {
        dashboard.snapshot()
    };

    Json(DataResponse::success(
        "Recovery dashboard".to_string(),
        DashboardView {
            tiles: crate::dashboard::summary_tiles(&snapshot),
            snapshot,
        },
        None,
    ))
}

pub async fn recovery_status_handler(
    recovery: &State<RecoveryViews>,
) -> Json<DataResponse<StatusWidget>> {
    if recovery.status.snapshot().refreshed_at.is_none() {
        recovery.status.refresh();
    }
    let widget = recovery.status.status_widget();
    Json(DataResponse::success(widget.label.clone(), widget, None))
}

pub async fn reset_breaker_handler(
    operation: &str,
    admin: OptionalAdmin,
    recovery: &State<RecoveryViews>,
) -> Result<Json<ActionResponse>, ApiError> {
    let outcome = admin_view(&admin, recovery).reset_circuit_breaker(operation);
    action_result(
        outcome,
        format!("Circuit breaker {} reset", operation),
        "reset_circuit_breaker",
        None,
    )
}

pub async fn force_open_breaker_handler(
    operation: &str,
    admin: OptionalAdmin,
    recovery: &State<RecoveryViews>,
) -> Result<Json<ActionResponse>, ApiError> {
    let outcome = admin_view(&admin, recovery).force_open_circuit_breaker(operation);
    action_result(
        outcome,
        format!("Circuit breaker {} forced open", operation),
        "force_open_circuit_breaker",
        None,
    )
}

pub async fn simulate_error_handler(
    operation: &str,
    request: Json<StandardRequest<SimulateErrorRequest>>,
    admin: OptionalAdmin,
    recovery: &State<RecoveryViews>,
) -> Result<Json<ActionResponse>, ApiError> {
    let conversation_id = request.conversation_id();
    let kind = ErrorKind::from_str(&request.data.kind).map_err(|e| {
        api_error(
            Status::BadRequest,
            e,
            "INVALID_ERROR_KIND",
            vec!["Use one of: network, timeout, api_limit, generic".to_string()],
            conversation_id.clone(),
        )
    })?;

    let outcome = admin_view(&admin, recovery).simulate_error(operation, kind);
    action_result(
        outcome,
        format!("Simulated {:?} error on {}", kind, operation),
        "simulate_error",
        conversation_id,
    )
}

pub async fn update_strategy_handler(
    name: &str,
    request: Json<StandardRequest<StrategyToggleRequest>>,
    admin: OptionalAdmin,
    recovery: &State<RecoveryViews>,
) -> Result<Json<ActionResponse>, ApiError> {
    let conversation_id = request.conversation_id();
    let enabled = request.data.enabled;

    match admin_view(&admin, recovery).update_fallback_strategy(name, enabled) {
        AdminOutcome::Applied(strategy) => Ok(Json(ActionResponse::success(
            format!(
                "Fallback strategy {} {}",
                strategy.name,
                if strategy.enabled { "enabled" } else { "disabled" }
            ),
            "update_fallback_strategy".to_string(),
            conversation_id,
        ))),
        AdminOutcome::Denied => Err(denied(conversation_id)),
        AdminOutcome::Failed { message, .. } => Err(api_error(
            Status::NotFound,
            message,
            "UNKNOWN_STRATEGY",
            vec!["Use one of the names listed in the dashboard strategies".to_string()],
            conversation_id,
        )),
    }
}

pub async fn clear_cache_handler(
    admin: OptionalAdmin,
    recovery: &State<RecoveryViews>,
) -> Result<Json<ActionResponse>, ApiError> {
    match admin_view(&admin, recovery).clear_fallback_cache() {
        AdminOutcome::Applied(cleared) => Ok(Json(ActionResponse::success(
            format!("Cleared {} cached entries", cleared),
            "clear_fallback_cache".to_string(),
            None,
        ))),
        AdminOutcome::Denied => Err(denied(None)),
        AdminOutcome::Failed { message, .. } => Err(internal(message, None)),
    }
}

pub async fn export_config_handler(
    admin: OptionalAdmin,
    recovery: &State<RecoveryViews>,
) -> Result<Json<DataResponse<String>>, ApiError> {
    match admin_view(&admin, recovery).export_config() {
        AdminOutcome::Applied(config) => Ok(Json(DataResponse::success(
            "Recovery configuration exported".to_string(),
            config,
            None,
        ))),
        AdminOutcome::Denied => Err(denied(None)),
        AdminOutcome::Failed { message, .. } => Err(internal(message, None)),
    }
}

pub async fn import_config_handler(
    request: Json<StandardRequest<ImportConfigRequest>>,
    admin: OptionalAdmin,
    recovery: &State<RecoveryViews>,
) -> Result<Json<ActionResponse>, ApiError> {
    let conversation_id = request.conversation_id();

    match admin_view(&admin, recovery).import_config(&request.data.config) {
        AdminOutcome::Applied(()) => Ok(Json(
            ActionResponse::success(
                "Recovery configuration imported".to_string(),
                "import_config".to_string(),
                conversation_id,
            )
            .with_next_actions(vec!["GET /api/recovery/dashboard?refresh=true".to_string()]),
        )),
        AdminOutcome::Denied => Err(denied(conversation_id)),
        AdminOutcome::Failed { message, .. } => Err(api_error(
            Status::UnprocessableEntity,
            message,
            "IMPORT_FAILED",
            vec![
                "Start from a configuration exported by GET /api/recovery/config".to_string(),
                "Thresholds must be at least 1 and strategy names unique".to_string(),
            ],
            conversation_id,
        )),
    }
}

/// View over the shared dashboard with admin rights taken from the request token.
fn admin_view(admin: &OptionalAdmin, recovery: &RecoveryViews) -> RecoveryDashboard {
    if let Some(admin) = &admin.admin {
        app_log!(info, "Recovery admin action by {}", admin.subject());
    }
    recovery.dashboard.with_admin(admin.is_admin())
}

fn action_result(
    outcome: AdminOutcome,
    message: String,
    action: &str,
    conversation_id: Option<String>,
) -> Result<Json<ActionResponse>, ApiError> {
    match outcome {
        AdminOutcome::Applied(()) => Ok(Json(ActionResponse::success(
            message,
            action.to_string(),
            conversation_id,
        ))),
        AdminOutcome::Denied => Err(denied(conversation_id)),
        AdminOutcome::Failed { message, .. } => Err(internal(message, conversation_id)),
    }
}

fn denied(conversation_id: Option<String>) -> ApiError {
    api_error(
        Status::Forbidden,
        "Admin access required",
        "ADMIN_REQUIRED",
        vec![
            "Send an admin token as 'Authorization: Bearer <token>'".to_string(),
            "Generate one with 'jobtrack admin-token'".to_string(),
        ],
        conversation_id,
    )
}

fn internal(message: String, conversation_id: Option<String>) -> ApiError {
    app_log!(error, "Recovery admin action failed: {}", message);
    api_error(
        Status::InternalServerError,
        message,
        "RECOVERY_ERROR",
        vec!["Try again in a few moments".to_string()],
        conversation_id,
    )
}
