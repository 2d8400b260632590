// src/web/handlers/system_handlers.rs
use crate::app_log;
use crate::auth::OptionalAdmin;
use crate::web::types::TextResponse;

use rocket::serde::json::Json;

pub async fn health_handler(admin: OptionalAdmin) -> Json<TextResponse> {
    if let Some(admin) = admin.admin {
        app_log!(info, "Health check by admin: {}", admin.subject());
    } else {
        app_log!(debug, "Health check by anonymous user");
    }
    Json(TextResponse::success(
        format!("Job tracker API {} is running", env!("CARGO_PKG_VERSION")),
        None,
    ))
}
