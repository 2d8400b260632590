// src/web/types.rs
use crate::dashboard::{DashboardSnapshot, SummaryTile};
use crate::intake::PanelState;
use crate::types::{ApplicationData, ParsedJobData};
use rocket::form::FromForm;
use rocket::fs::TempFile;
use rocket::http::Status;
use rocket::response::status::Custom;
use rocket::serde::json::Json;
use rocket::serde::{Deserialize, Serialize};

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct TextResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DataResponse<T> {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct ActionResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub message: String,
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_actions: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardErrorResponse {
    #[serde(rename = "type")]
    pub response_type: ResponseType,
    pub success: bool,
    pub error: String,
    pub error_code: String,
    pub suggestions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde", rename_all = "lowercase")]
pub enum ResponseType {
    Text,
    Data,
    Action,
    Error,
}

/// Error body plus the HTTP status it goes out with.
pub type ApiError = Custom<Json<StandardErrorResponse>>;

// Request types with conversation_id support
#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct StandardRequest<T> {
    #[serde(flatten)]
    pub data: T,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

pub trait WithConversationId {
    fn conversation_id(&self) -> Option<String>;
}

impl<T> WithConversationId for StandardRequest<T> {
    fn conversation_id(&self) -> Option<String> {
        self.conversation_id.clone()
    }
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ParseTextRequest {
    pub text: String,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ParseUrlRequest {
    pub url: String,
}

#[derive(FromForm)]
pub struct IntakeUploadForm<'f> {
    pub files: Vec<TempFile<'f>>,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct SimulateErrorRequest {
    pub kind: String,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct StrategyToggleRequest {
    pub enabled: bool,
}

#[derive(Deserialize)]
#[serde(crate = "rocket::serde")]
pub struct ImportConfigRequest {
    pub config: String,
}

/// What an intake call produced, alongside the panel state it left behind.
#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct IntakeResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<ParsedJobData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub application: Option<ApplicationData>,
    pub panel: PanelState,
}

#[derive(Serialize)]
#[serde(crate = "rocket::serde")]
pub struct DashboardView {
    pub tiles: Vec<SummaryTile>,
    #[serde(flatten)]
    pub snapshot: DashboardSnapshot,
}

// Helper functions to create standard responses
impl TextResponse {
    pub fn success(message: String, conversation_id: Option<String>) -> Self {
        Self {
            response_type: ResponseType::Text,
            success: true,
            message,
            conversation_id,
        }
    }
}

impl<T> DataResponse<T> {
    pub fn success(message: String, data: T, conversation_id: Option<String>) -> Self {
        Self {
            response_type: ResponseType::Data,
            success: true,
            message,
            data,
            conversation_id,
        }
    }
}

impl ActionResponse {
    pub fn success(message: String, action: String, conversation_id: Option<String>) -> Self {
        Self {
            response_type: ResponseType::Action,
            success: true,
            message,
            action,
            next_actions: None,
            conversation_id,
        }
    }

    pub fn with_next_actions(mut self, next_actions: Vec<String>) -> Self {
        self.next_actions = Some(next_actions);
        self
    }
}

impl StandardErrorResponse {
    pub fn new(
        error: String,
        error_code: String,
        suggestions: Vec<String>,
        conversation_id: Option<String>,
    ) -> Self {
        Self {
            response_type: ResponseType::Error,
            success: false,
            error,
            error_code,
            suggestions,
            conversation_id,
        }
    }
}

pub fn api_error(
    status: Status,
    error: impl Into<String>,
    error_code: &str,
    suggestions: Vec<String>,
    conversation_id: Option<String>,
) -> ApiError {
    Custom(
        status,
        Json(StandardErrorResponse::new(
            error.into(),
            error_code.to_string(),
            suggestions,
            conversation_id,
        )),
    )
}
