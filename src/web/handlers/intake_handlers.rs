// src/web/handlers/intake_handlers.rs
use crate::app_log;
use crate::intake::tips::{extraction_tips, MAX_TIPS_SHOWN};
use crate::intake::{CollectingSink, FileUpload, PanelErrorKind, PanelState};
use crate::web::services::IntakeServices;
use crate::web::types::{
    api_error, ApiError, DataResponse, IntakeResult, IntakeUploadForm, ParseTextRequest,
    ParseUrlRequest, StandardRequest, WithConversationId,
};
use rocket::form::Form;
use rocket::fs::TempFile;
use rocket::http::Status;
use rocket::serde::json::Json;
use rocket::State;
use std::path::Path;

type IntakeResponse = Result<Json<DataResponse<IntakeResult>>, ApiError>;

pub async fn parse_text_handler(
    request: Json<StandardRequest<ParseTextRequest>>,
    intake: &State<IntakeServices>,
) -> IntakeResponse {
    let conversation_id = request.conversation_id();
    app_log!(info, "Parsing pasted job description ({} chars)", request.data.text.len());

    let (panel, sink) = intake.panel();
    panel.set_text_input(request.into_inner().data.text);
    panel.handle_text_parse();

    respond(panel.state(), &sink, conversation_id)
}

pub async fn parse_url_handler(
    request: Json<StandardRequest<ParseUrlRequest>>,
    intake: &State<IntakeServices>,
) -> IntakeResponse {
    let conversation_id = request.conversation_id();
    app_log!(info, "Parsing job description from URL: {}", request.data.url);

    let (panel, sink) = intake.panel();
    panel.set_url_input(request.into_inner().data.url);
    panel.handle_url_parse().await;

    respond(panel.state(), &sink, conversation_id)
}

pub async fn upload_file_handler(
    mut upload: Form<IntakeUploadForm<'_>>,
    intake: &State<IntakeServices>,
) -> IntakeResponse {
    // Drag-and-drop may carry several files; only the first is used.
    let Some(temp_file) = upload.files.first_mut() else {
        return Err(api_error(
            Status::BadRequest,
            "No file uploaded",
            "NO_FILE",
            vec!["Attach a file in the 'files' form field".to_string()],
            None,
        ));
    };

    let file = read_upload(temp_file).await?;
    app_log!(info, "Received upload {} ({} bytes)", file.name, file.size());

    let (panel, sink) = intake.panel();
    panel.handle_files(vec![file]).await;

    respond(panel.state(), &sink, None)
}

pub async fn extraction_tips_handler(url: Option<String>) -> Json<DataResponse<Vec<String>>> {
    let tips: Vec<String> = extraction_tips(url.as_deref())
        .into_iter()
        .take(MAX_TIPS_SHOWN)
        .collect();

    Json(DataResponse::success(
        format!("{} extraction tips", tips.len()),
        tips,
        None,
    ))
}

async fn read_upload(file: &mut TempFile<'_>) -> Result<FileUpload, ApiError> {
    let name = upload_name(file);
    let content_type = file.content_type().map(|ct| ct.to_string());

    let temp_path = std::env::temp_dir().join(format!("intake_upload_{}", uuid::Uuid::new_v4()));

    if let Err(e) = file.persist_to(&temp_path).await {
        app_log!(error, "Failed to save uploaded file: {}", e);
        return Err(api_error(
            Status::InternalServerError,
            "Failed to process uploaded file",
            "FILE_SAVE_ERROR",
            vec!["Try uploading the file again".to_string()],
            None,
        ));
    }

    let bytes = tokio::fs::read(&temp_path).await;
    let _ = tokio::fs::remove_file(&temp_path).await;

    let bytes = bytes.map_err(|e| {
        app_log!(error, "Failed to read uploaded file: {}", e);
        api_error(
            Status::InternalServerError,
            "Failed to process uploaded file",
            "FILE_READ_ERROR",
            vec!["Try uploading the file again".to_string()],
            None,
        )
    })?;

    let upload = FileUpload::new(name, bytes);
    Ok(match content_type {
        Some(ct) => upload.with_content_type(ct),
        None => upload,
    })
}

/// Client file name without any directory part, falling back to the content type.
fn upload_name(file: &TempFile<'_>) -> String {
    let raw = file
        .raw_name()
        .map(|name| name.dangerous_unsafe_unsanitized_raw().as_str().to_string());

    raw.as_deref()
        .and_then(|raw| Path::new(raw).file_name())
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .or_else(|| {
            file.content_type()
                .and_then(|ct| ct.extension())
                .map(|ext| format!("upload.{}", ext))
        })
        .unwrap_or_else(|| "upload".to_string())
}

fn respond(
    state: PanelState,
    sink: &CollectingSink,
    conversation_id: Option<String>,
) -> IntakeResponse {
    if let Some(manual) = &state.manual_override {
        return Err(api_error(
            Status::UnprocessableEntity,
            format!("{}. Open {} and paste the description instead.", manual.message, manual.url),
            "SITE_BLOCKED",
            manual.tips.clone(),
            conversation_id,
        ));
    }

    if let Some(error) = &state.error {
        let kind = state.error_kind.unwrap_or(PanelErrorKind::ExtractionFailed);
        let (status, error_code, suggestions) = categorize_error(kind);
        return Err(api_error(status, error.clone(), error_code, suggestions, conversation_id));
    }

    let message = state
        .success
        .clone()
        .unwrap_or_else(|| "Nothing to process".to_string());

    Ok(Json(DataResponse::success(
        message,
        IntakeResult {
            job: sink.parsed().into_iter().next(),
            application: sink.applications().into_iter().next(),
            panel: state,
        },
        conversation_id,
    )))
}

fn categorize_error(kind: PanelErrorKind) -> (Status, &'static str, Vec<String>) {
    match kind {
        PanelErrorKind::EmptyInput => (
            Status::BadRequest,
            "EMPTY_INPUT",
            vec!["Provide the job description text or a link to it".to_string()],
        ),
        PanelErrorKind::InvalidUrl => (
            Status::BadRequest,
            "INVALID_URL",
            vec!["Copy the full address from the browser bar, including https://".to_string()],
        ),
        PanelErrorKind::InvalidFile => (
            Status::BadRequest,
            "INVALID_FILE",
            vec![
                "Accepted types: .json, .txt, .md, .pdf, .doc, .docx".to_string(),
                "Maximum size is 5MB".to_string(),
            ],
        ),
        PanelErrorKind::InvalidJson => (
            Status::UnprocessableEntity,
            "INVALID_JSON",
            vec!["Check the file is valid JSON with an 'applications' array".to_string()],
        ),
        PanelErrorKind::NoApplications => (
            Status::UnprocessableEntity,
            "NO_APPLICATIONS",
            vec!["Add at least one entry to the 'applications' array".to_string()],
        ),
        PanelErrorKind::ParseFailed => (
            Status::UnprocessableEntity,
            "PARSE_ERROR",
            vec![
                "Make sure the text includes the job title and requirements".to_string(),
                "Try pasting the description as plain text".to_string(),
            ],
        ),
        PanelErrorKind::ExtractionFailed => (
            Status::BadGateway,
            "EXTRACTION_ERROR",
            vec![
                "Check that the job URL is reachable".to_string(),
                "Try again in a few moments".to_string(),
                "Paste the description as text instead".to_string(),
            ],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categorize_error_kinds() {
        assert_eq!(categorize_error(PanelErrorKind::EmptyInput).1, "EMPTY_INPUT");
        assert_eq!(categorize_error(PanelErrorKind::InvalidUrl).0, Status::BadRequest);
        assert_eq!(categorize_error(PanelErrorKind::NoApplications).1, "NO_APPLICATIONS");
        assert_eq!(categorize_error(PanelErrorKind::ParseFailed).1, "PARSE_ERROR");
        assert_eq!(categorize_error(PanelErrorKind::ExtractionFailed).1, "EXTRACTION_ERROR");
    }

    #[test]
    fn test_respond_uses_error_kind_not_message() {
        let sink = CollectingSink::default();
        let state = PanelState {
            error: Some("Please enter some text to parse".to_string()),
            error_kind: Some(PanelErrorKind::ExtractionFailed),
            ..Default::default()
        };

        let err = respond(state, &sink, None).err().expect("error response");
        assert_eq!(err.0, Status::BadGateway);
        assert_eq!(err.1.error_code, "EXTRACTION_ERROR");
    }

    #[test]
    fn test_respond_success_carries_job() {
        let sink = CollectingSink::default();
        crate::intake::IntakeSink::on_data_extracted(&sink, Default::default());
        let state = PanelState {
            success: Some("done".to_string()),
            ..Default::default()
        };

        let response = respond(state, &sink, Some("c1".to_string()))
            .map_err(|_| "error")
            .unwrap();
        assert_eq!(response.message, "done");
        assert!(response.data.job.is_some());
        assert!(response.data.application.is_none());
    }
}
