// src/web/mod.rs

pub mod handlers;
pub mod services;
pub mod types;

pub use services::{AppState, IntakeServices, RecoveryViews};
pub use types::*;

use crate::app_log;
use crate::auth::OptionalAdmin;
use crate::config::{AppConfig, ServerSettings};
use crate::dashboard::{DashboardPoller, StatusWidget};
use crate::recovery::{CircuitBreakerState, HealthStatus};
use anyhow::Result;
use rocket::data::{Limits, ToByteUnit};
use rocket::fairing::{Fairing, Info, Kind};
use rocket::form::Form;
use rocket::http::{Header, Status};
use rocket::serde::json::Json;
use rocket::{catchers, get, options, post, routes, Build, Request, Response, Rocket, State};
use std::collections::BTreeMap;

// CORS Fairing
pub struct Cors;

#[rocket::async_trait]
impl Fairing for Cors {
    fn info(&self) -> Info {
        Info {
            name: "Add CORS headers to responses",
            kind: Kind::Response,
        }
    }

    async fn on_response<'r>(&self, _request: &'r Request<'_>, response: &mut Response<'r>) {
        response.set_header(Header::new("Access-Control-Allow-Origin", "*"));
        response.set_header(Header::new(
            "Access-Control-Allow-Methods",
            "POST, GET, OPTIONS",
        ));
        response.set_header(Header::new("Access-Control-Allow-Headers", "*"));
        response.set_header(Header::new("Access-Control-Allow-Credentials", "true"));
    }
}

// Intake

#[post("/intake/text", data = "<request>")]
pub async fn parse_text(
    request: Json<StandardRequest<ParseTextRequest>>,
    intake: &State<IntakeServices>,
) -> Result<Json<DataResponse<IntakeResult>>, ApiError> {
    handlers::parse_text_handler(request, intake).await
}

#[post("/intake/url", data = "<request>")]
pub async fn parse_url(
    request: Json<StandardRequest<ParseUrlRequest>>,
    intake: &State<IntakeServices>,
) -> Result<Json<DataResponse<IntakeResult>>, ApiError> {
    handlers::parse_url_handler(request, intake).await
}

#[post("/intake/file", data = "<upload>")]
pub async fn upload_file(
    upload: Form<IntakeUploadForm<'_>>,
    intake: &State<IntakeServices>,
) -> Result<Json<DataResponse<IntakeResult>>, ApiError> {
    handlers::upload_file_handler(upload, intake).await
}

#[get("/intake/tips?<url>")]
pub async fn extraction_tips(url: Option<String>) -> Json<DataResponse<Vec<String>>> {
    handlers::extraction_tips_handler(url).await
}

// Recovery, read side

#[get("/recovery/health")]
pub async fn recovery_health(recovery: &State<RecoveryViews>) -> Json<DataResponse<HealthStatus>> {
    handlers::recovery_health_handler(recovery).await
}

#[get("/recovery/breakers")]
pub async fn recovery_breakers(
    recovery: &State<RecoveryViews>,
) -> Json<DataResponse<BTreeMap<String, CircuitBreakerState>>> {
    handlers::recovery_breakers_handler(recovery).await
}

#[get("/recovery/dashboard?<refresh>")]
pub async fn recovery_dashboard(
    refresh: Option<bool>,
    recovery: &State<RecoveryViews>,
) -> Json<DataResponse<DashboardView>> {
    handlers::recovery_dashboard_handler(refresh.unwrap_or(false), recovery).await
}

#[get("/recovery/status")]
pub async fn recovery_status(recovery: &State<RecoveryViews>) -> Json<DataResponse<StatusWidget>> {
    handlers::recovery_status_handler(recovery).await
}

// Recovery, admin side

#[post("/recovery/breakers/<operation>/reset")]
pub async fn reset_breaker(
    operation: &str,
    admin: OptionalAdmin,
    recovery: &State<RecoveryViews>,
) -> Result<Json<ActionResponse>, ApiError> {
    handlers::reset_breaker_handler(operation, admin, recovery).await
}

#[post("/recovery/breakers/<operation>/force-open")]
pub async fn force_open_breaker(
    operation: &str,
    admin: OptionalAdmin,
    recovery: &State<RecoveryViews>,
) -> Result<Json<ActionResponse>, ApiError> {
    handlers::force_open_breaker_handler(operation, admin, recovery).await
}

#[post("/recovery/breakers/<operation>/simulate", data = "<request>")]
pub async fn simulate_error(
    operation: &str,
    request: Json<StandardRequest<SimulateErrorRequest>>,
    admin: OptionalAdmin,
    recovery: &State<RecoveryViews>,
) -> Result<Json<ActionResponse>, ApiError> {
    handlers::simulate_error_handler(operation, request, admin, recovery).await
}

#[post("/recovery/strategies/<name>", data = "<request>")]
pub async fn update_strategy(
    name: &str,
    request: Json<StandardRequest<StrategyToggleRequest>>,
    admin: OptionalAdmin,
    recovery: &State<RecoveryViews>,
) -> Result<Json<ActionResponse>, ApiError> {
    handlers::update_strategy_handler(name, request, admin, recovery).await
}

#[post("/recovery/cache/clear")]
pub async fn clear_cache(
    admin: OptionalAdmin,
    recovery: &State<RecoveryViews>,
) -> Result<Json<ActionResponse>, ApiError> {
    handlers::clear_cache_handler(admin, recovery).await
}

#[get("/recovery/config")]
pub async fn export_config(
    admin: OptionalAdmin,
    recovery: &State<RecoveryViews>,
) -> Result<Json<DataResponse<String>>, ApiError> {
    handlers::export_config_handler(admin, recovery).await
}

#[post("/recovery/config", data = "<request>")]
pub async fn import_config(
    request: Json<StandardRequest<ImportConfigRequest>>,
    admin: OptionalAdmin,
    recovery: &State<RecoveryViews>,
) -> Result<Json<ActionResponse>, ApiError> {
    handlers::import_config_handler(request, admin, recovery).await
}

#[get("/health")]
pub async fn health(admin: OptionalAdmin) -> Json<TextResponse> {
    handlers::health_handler(admin).await
}

#[options("/<_..>")]
pub async fn options() -> Status {
    Status::Ok
}

// Error catchers
#[rocket::catch(400)]
pub fn bad_request() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Invalid request format".to_string(),
        "BAD_REQUEST".to_string(),
        vec![
            "Check your request JSON format".to_string(),
            "Verify all required fields are present".to_string(),
        ],
        None,
    ))
}

#[rocket::catch(401)]
pub fn unauthorized() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Authentication required".to_string(),
        "UNAUTHORIZED".to_string(),
        vec!["Send an admin token as 'Authorization: Bearer <token>'".to_string()],
        None,
    ))
}

#[rocket::catch(403)]
pub fn forbidden() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Admin access required".to_string(),
        "FORBIDDEN".to_string(),
        vec!["Ask an administrator for an admin token".to_string()],
        None,
    ))
}

#[rocket::catch(404)]
pub fn not_found() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Resource not found".to_string(),
        "NOT_FOUND".to_string(),
        vec!["Check the endpoint path".to_string()],
        None,
    ))
}

#[rocket::catch(422)]
pub fn unprocessable() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Request body could not be parsed".to_string(),
        "UNPROCESSABLE_ENTITY".to_string(),
        vec!["Verify field names and types".to_string()],
        None,
    ))
}

#[rocket::catch(500)]
pub fn internal_error() -> Json<StandardErrorResponse> {
    Json(StandardErrorResponse::new(
        "Internal server error".to_string(),
        "INTERNAL_ERROR".to_string(),
        vec![
            "Try again in a few moments".to_string(),
            "Contact support if the problem persists".to_string(),
        ],
        None,
    ))
}

/// Assembles the app without launching it.
pub fn build_rocket(state: AppState, server: &ServerSettings) -> Rocket<Build> {
    // Leave room above the panel's own limit so oversized files reach its
    // validator and get the fixed rejection message.
    let max_upload = state.intake.max_file_size * 2;
    let limits = Limits::default()
        .limit("file", max_upload.bytes())
        .limit("data-form", (max_upload + 1024 * 1024).bytes());

    let figment = rocket::Config::figment()
        .merge(("address", server.address.clone()))
        .merge(("port", server.port))
        .merge(("limits", limits));

    let AppState {
        intake,
        recovery,
        auth,
    } = state;

    rocket::custom(figment)
        .attach(Cors)
        .manage(intake)
        .manage(recovery)
        .manage(auth)
        .register(
            "/api",
            catchers![
                bad_request,
                unauthorized,
                forbidden,
                not_found,
                unprocessable,
                internal_error
            ],
        )
        .mount(
            "/api",
            routes![
                parse_text,
                parse_url,
                upload_file,
                extraction_tips,
                recovery_health,
                recovery_breakers,
                recovery_dashboard,
                recovery_status,
                reset_breaker,
                force_open_breaker,
                simulate_error,
                update_strategy,
                clear_cache,
                export_config,
                import_config,
                health,
                options,
            ],
        )
}

// Main server start function
pub async fn start_web_server(config: AppConfig) -> Result<()> {
    let state = AppState::from_config(&config)?;

    let _pollers = [
        DashboardPoller::spawn(
            state.recovery.dashboard.clone(),
            config.dashboard.poll_interval(),
        ),
        DashboardPoller::spawn(
            state.recovery.status.clone(),
            config.dashboard.compact_poll_interval(),
        ),
    ];

    app_log!(info, "Starting job tracker API server");
    app_log!(
        info,
        "Server: http://{}:{}",
        config.server.address,
        config.server.port
    );
    match &config.extraction.conversion_service_url {
        Some(url) => app_log!(info, "Conversion service: {}", url),
        None => app_log!(warn, "No conversion service configured, PDF and Word uploads will fail"),
    }

    build_rocket(state, &config.server)
        .launch()
        .await
        .map_err(|e| anyhow::anyhow!("Rocket server failed: {}", e))?;

    app_log!(info, "Server stopped");
    Ok(())
}
