// src/intake/mod.rs
//! Upload panel: turns a file, a URL or pasted text into structured job data.
//!
//! The panel owns only its form state. Parsing and extraction are injected,
//! and results leave through an [`IntakeSink`].

pub mod extractor;
pub mod parser;
pub mod service_client;
pub mod tips;
pub mod validation;

pub use extractor::{HttpTextExtractor, TextExtractor};
pub use parser::{HeuristicParser, JobDescriptionParser};
pub use validation::{validate_file, validate_url, FileUpload};

use crate::app_log;
use crate::error::IntakeError;
use crate::types::{first_application, ApplicationData, ParsedJobData};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tips::{extraction_tips, MAX_TIPS_SHOWN};
use validation::{validate_file_with_limit, MAX_FILE_SIZE};

pub const EMPTY_TEXT: &str = "Please enter some text to parse";
pub const EMPTY_URL: &str = "Please enter a URL";
pub const INVALID_URL: &str = "Please enter a valid URL starting with http:// or https://";
pub const INVALID_FILE: &str = "Please upload a valid file (JSON, TXT, MD, PDF, DOC, DOCX) under 5MB";
pub const INVALID_JSON: &str = "Invalid JSON file format";
pub const NO_APPLICATIONS: &str = "No applications found in the JSON file";
pub const FILE_FAILED: &str = "Failed to process file. Please try again.";
pub const PARSE_FAILED: &str = "Failed to parse job description. Please try again.";
pub const URL_SUCCESS: &str = "Successfully extracted job description from URL";
pub const TEXT_SUCCESS: &str = "Successfully parsed job description";

/// Receives whatever the panel extracts.
pub trait IntakeSink: Send + Sync {
    fn on_data_extracted(&self, data: ParsedJobData);

    fn on_application_data_extracted(&self, data: ApplicationData);
}

/// Sink that keeps every delivered value, in order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    parsed: Mutex<Vec<ParsedJobData>>,
    applications: Mutex<Vec<ApplicationData>>,
}

impl CollectingSink {
    pub fn parsed(&self) -> Vec<ParsedJobData> {
        self.parsed.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn applications(&self) -> Vec<ApplicationData> {
        self.applications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl IntakeSink for CollectingSink {
    fn on_data_extracted(&self, data: ParsedJobData) {
        self.parsed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(data);
    }

    fn on_application_data_extracted(&self, data: ApplicationData) {
        self.applications
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(data);
    }
}

/// Shown when a site refuses automated requests.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ManualOverride {
    /// Page the user should open and copy from.
    pub url: String,
    pub tips: Vec<String>,
    pub message: String,
}

/// Category of the current error banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelErrorKind {
    EmptyInput,
    InvalidUrl,
    InvalidFile,
    InvalidJson,
    NoApplications,
    ParseFailed,
    ExtractionFailed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PanelState {
    pub busy: bool,
    pub error: Option<String>,
    pub error_kind: Option<PanelErrorKind>,
    pub success: Option<String>,
    pub text_input: String,
    pub url_input: String,
    pub manual_override: Option<ManualOverride>,
}

impl PanelState {
    fn fail(&mut self, kind: PanelErrorKind, message: impl Into<String>) {
        self.error = Some(message.into());
        self.error_kind = Some(kind);
    }
}

/// Form state for the three intake paths.
///
/// Each operation takes a generation token when it starts. An operation
/// whose awaited extraction finishes after a newer one started is dropped
/// without touching state or the sink. Validation failures are reported
/// immediately and do not take a token.
pub struct IntakePanel {
    parser: Arc<dyn JobDescriptionParser>,
    extractor: Arc<dyn TextExtractor>,
    sink: Arc<dyn IntakeSink>,
    max_file_size: u64,
    state: Mutex<PanelState>,
    generation: AtomicU64,
}

impl IntakePanel {
    pub fn new(
        parser: Arc<dyn JobDescriptionParser>,
        extractor: Arc<dyn TextExtractor>,
        sink: Arc<dyn IntakeSink>,
    ) -> Self {
        Self {
            parser,
            extractor,
            sink,
            max_file_size: MAX_FILE_SIZE,
            state: Mutex::new(PanelState::default()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = max_file_size;
        self
    }

    pub fn state(&self) -> PanelState {
        self.lock().clone()
    }

    pub fn set_text_input(&self, text: impl Into<String>) {
        self.lock().text_input = text.into();
    }

    pub fn set_url_input(&self, url: impl Into<String>) {
        self.lock().url_input = url.into();
    }

    pub fn dismiss_manual_override(&self) {
        self.lock().manual_override = None;
    }

    pub fn handle_text_parse(&self) {
        let text = self.lock().text_input.clone();
        if text.trim().is_empty() {
            self.reject(PanelErrorKind::EmptyInput, EMPTY_TEXT);
            return;
        }

        let token = self.begin();
        match self.parser.parse(&text) {
            Ok(data) => {
                if self.finish(token, |state| state.success = Some(TEXT_SUCCESS.to_string())) {
                    self.sink.on_data_extracted(data);
                }
            }
            Err(e) => {
                app_log!(warn, "Failed to parse pasted job description: {}", e);
                self.finish(token, |state| state.fail(PanelErrorKind::ParseFailed, PARSE_FAILED));
            }
        }
    }

    pub async fn handle_url_parse(&self) {
        let url = self.lock().url_input.trim().to_string();
        if url.is_empty() {
            self.reject(PanelErrorKind::EmptyInput, EMPTY_URL);
            return;
        }
        if !validate_url(&url) {
            self.reject(PanelErrorKind::InvalidUrl, INVALID_URL);
            return;
        }

        let token = self.begin();
        app_log!(info, "Extracting job description from URL: {}", url);

        match self.extractor.extract_from_url(&url).await {
            Ok(text) => match self.parser.parse(&text) {
                Ok(data) => {
                    let applied = self.finish(token, |state| {
                        state.text_input = text;
                        state.url_input.clear();
                        state.success = Some(URL_SUCCESS.to_string());
                    });
                    if applied {
                        self.sink.on_data_extracted(data);
                    }
                }
                Err(e) => {
                    app_log!(warn, "Extracted text from {} did not parse: {}", url, e);
                    self.finish(token, |state| {
                        state.text_input = text;
                        state.url_input.clear();
                        state.fail(PanelErrorKind::ParseFailed, PARSE_FAILED);
                    });
                }
            },
            Err(e) if e.is_blocked() => {
                app_log!(info, "Site blocked extraction, offering manual copy: {}", e);
                let tips = extraction_tips(Some(&url))
                    .into_iter()
                    .take(MAX_TIPS_SHOWN)
                    .collect();
                self.finish(token, |state| {
                    state.manual_override = Some(ManualOverride {
                        url,
                        tips,
                        message: e.message,
                    });
                });
            }
            Err(e) => {
                app_log!(error, "URL extraction failed: {}", e);
                self.finish(token, |state| state.fail(PanelErrorKind::ExtractionFailed, e.message));
            }
        }
    }

    /// Drag-and-drop and browse both land here; only the first file counts.
    pub async fn handle_files(&self, files: Vec<FileUpload>) {
        if let Some(file) = files.into_iter().next() {
            self.handle_file(file).await;
        }
    }

    pub async fn handle_file(&self, file: FileUpload) {
        if !validate_file_with_limit(&file, self.max_file_size) {
            app_log!(warn, "Rejected upload {} ({} bytes)", file.name, file.size());
            self.reject(PanelErrorKind::InvalidFile, INVALID_FILE);
            return;
        }

        if file.is_json() {
            self.load_application_data(&file.bytes);
            return;
        }

        let token = self.begin();
        app_log!(info, "Extracting job description from file: {}", file.name);

        let result: Result<ParsedJobData, IntakeError> =
            match self.extractor.extract_from_file(&file).await {
                Ok(text) => self.parser.parse(&text),
                Err(e) => Err(e.into()),
            };

        match result {
            Ok(data) => {
                let message = format!("Successfully parsed job description from {}", file.name);
                if self.finish(token, |state| state.success = Some(message)) {
                    self.sink.on_data_extracted(data);
                }
            }
            Err(e) => {
                app_log!(error, "Failed to process {}: {}", file.name, e);
                self.finish(token, |state| state.fail(PanelErrorKind::ParseFailed, FILE_FAILED));
            }
        }
    }

    /// Reads `applications[0]` from an application-data template.
    pub fn load_application_data(&self, bytes: &[u8]) {
        let token = self.begin();

        let document: serde_json::Value = match serde_json::from_slice(bytes) {
            Ok(document) => document,
            Err(e) => {
                app_log!(warn, "Application template is not JSON: {}", e);
                self.finish(token, |state| state.fail(PanelErrorKind::InvalidJson, INVALID_JSON));
                return;
            }
        };

        match first_application(&document) {
            Some(application) => {
                let message = format!(
                    "Successfully loaded application data for {}",
                    application.headline()
                );
                if self.finish(token, |state| state.success = Some(message)) {
                    self.sink.on_application_data_extracted(application);
                }
            }
            None => {
                self.finish(token, |state| {
                    state.fail(PanelErrorKind::NoApplications, NO_APPLICATIONS)
                });
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, PanelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn begin(&self) -> u64 {
        let token = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut state = self.lock();
        state.busy = true;
        state.error = None;
        state.error_kind = None;
        state.success = None;
        state.manual_override = None;
        token
    }

    /// Applies `update` if `token` is still the latest operation.
    fn finish(&self, token: u64, update: impl FnOnce(&mut PanelState)) -> bool {
        let mut state = self.lock();
        if self.generation.load(Ordering::SeqCst) != token {
            app_log!(debug, "Discarding result of superseded intake operation {}", token);
            return false;
        }
        state.busy = false;
        update(&mut state);
        true
    }

    fn reject(&self, kind: PanelErrorKind, message: &str) {
        let mut state = self.lock();
        state.fail(kind, message);
        state.success = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractionError;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::Notify;

    struct EchoParser;

    impl JobDescriptionParser for EchoParser {
        fn parse(&self, text: &str) -> Result<ParsedJobData, IntakeError> {
            if text.contains("gibberish") {
                return Err(IntakeError::Unrecognized);
            }
            Ok(ParsedJobData {
                title: text.lines().next().map(str::to_string),
                description: text.to_string(),
                ..Default::default()
            })
        }
    }

    #[derive(Default)]
    struct ScriptedExtractor {
        url_calls: AtomicUsize,
        started: Notify,
        release: Notify,
    }

    #[rocket::async_trait]
    impl TextExtractor for ScriptedExtractor {
        async fn extract_from_file(&self, file: &FileUpload) -> Result<String, ExtractionError> {
            match file.name.as_str() {
                "broken.pdf" => Err(ExtractionError::invalid("corrupt PDF")),
                _ => Ok(String::from_utf8_lossy(&file.bytes).into_owned()),
            }
        }

        async fn extract_from_url(&self, url: &str) -> Result<String, ExtractionError> {
            self.url_calls.fetch_add(1, Ordering::SeqCst);
            if url.contains("linkedin") {
                return Err(ExtractionError::blocked(
                    "linkedin.com blocks external requests (HTTP 999)",
                ));
            }
            if url.contains("down") {
                return Err(ExtractionError::network("HTTP error: 502 Bad Gateway"));
            }
            if url.contains("slow") {
                self.started.notify_one();
                self.release.notified().await;
                return Ok("Slow Engineer\nold posting".to_string());
            }
            if url.contains("noise") {
                return Ok("gibberish".to_string());
            }
            Ok("Platform Engineer\nBuild the platform.".to_string())
        }
    }

    fn panel() -> (Arc<IntakePanel>, Arc<ScriptedExtractor>, Arc<CollectingSink>) {
        let extractor = Arc::new(ScriptedExtractor::default());
        let sink = Arc::new(CollectingSink::default());
        let panel = IntakePanel::new(Arc::new(EchoParser), extractor.clone(), sink.clone());
        (Arc::new(panel), extractor, sink)
    }

    fn json_file(body: &str) -> FileUpload {
        FileUpload::new("app.json", body.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_json_with_one_application_reports_headline() {
        let (panel, _, sink) = panel();
        panel
            .handle_file(json_file(
                r#"{"applications":[{"position":"Engineer","company_name":"Acme"}]}"#,
            ))
            .await;

        let state = panel.state();
        assert_eq!(
            state.success.as_deref(),
            Some("Successfully loaded application data for Engineer at Acme")
        );
        assert!(state.error.is_none());
        assert!(!state.busy);
        assert_eq!(sink.applications().len(), 1);
    }

    #[tokio::test]
    async fn test_json_forwards_only_first_application() {
        let (panel, _, sink) = panel();
        panel
            .handle_file(json_file(
                r#"{"applications":[{"position":"First"},{"position":"Second"},{"position":"Third"}]}"#,
            ))
            .await;

        let applications = sink.applications();
        assert_eq!(applications.len(), 1);
        assert_eq!(applications[0].position.as_deref(), Some("First"));
    }

    #[tokio::test]
    async fn test_json_without_applications_invokes_nothing() {
        let (panel, _, sink) = panel();
        panel.handle_file(json_file(r#"{"applications":[]}"#)).await;

        assert_eq!(panel.state().error.as_deref(), Some(NO_APPLICATIONS));
        assert_eq!(panel.state().error_kind, Some(PanelErrorKind::NoApplications));
        assert!(sink.applications().is_empty());
        assert!(sink.parsed().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_json_is_reported() {
        let (panel, _, sink) = panel();
        panel.handle_file(json_file("{ not json")).await;
        assert_eq!(panel.state().error.as_deref(), Some(INVALID_JSON));

        assert!(sink.applications().is_empty());
    }

    #[tokio::test]
    async fn test_loosely_typed_application_is_forwarded() {
        let (panel, _, sink) = panel();
        panel
            .handle_file(json_file(
                r#"{"applications":[{"position":"Engineer","company_name":"Acme","salary_min":"120000"}]}"#,
            ))
            .await;
        let state = panel.state();
        assert!(state.error.is_none());
        assert_eq!(
            state.success.as_deref(),
            Some("Successfully loaded application data for Engineer at Acme")
        );
        let forwarded = sink.applications();
        assert_eq!(forwarded.len(), 1);
        assert_eq!(forwarded[0].salary_min, Some(120000.0));

        panel
            .handle_file(json_file(r#"{"applications":["Engineer at Acme"]}"#))
            .await;
        assert!(panel.state().error.is_none());
        assert_eq!(sink.applications().len(), 2);
        assert_eq!(sink.applications()[1], ApplicationData::default());
    }

    #[test]
    fn test_empty_text_is_rejected_without_callback() {
        let (panel, _, sink) = panel();
        panel.set_text_input("   \n\t ");
        panel.handle_text_parse();

        assert_eq!(panel.state().error.as_deref(), Some(EMPTY_TEXT));
        assert_eq!(panel.state().error_kind, Some(PanelErrorKind::EmptyInput));
        assert!(sink.parsed().is_empty());
    }

    #[test]
    fn test_text_parse_failure_and_success() {
        let (panel, _, sink) = panel();
        panel.set_text_input("gibberish");
        panel.handle_text_parse();
        assert_eq!(panel.state().error.as_deref(), Some(PARSE_FAILED));

        panel.set_text_input("Data Engineer\nPipelines");
        panel.handle_text_parse();
        let state = panel.state();
        assert!(state.error.is_none());
        assert!(state.error_kind.is_none());
        assert_eq!(state.success.as_deref(), Some(TEXT_SUCCESS));
        assert_eq!(sink.parsed().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_url_never_reaches_extractor() {
        let (panel, extractor, _) = panel();

        panel.set_url_input("");
        panel.handle_url_parse().await;
        assert_eq!(panel.state().error.as_deref(), Some(EMPTY_URL));

        for url in ["www.example.com/job", "ftp://example.com/job", "example"] {
            panel.set_url_input(url);
            panel.handle_url_parse().await;
            assert_eq!(panel.state().error.as_deref(), Some(INVALID_URL));
        }
        assert_eq!(extractor.url_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_url_moves_text_and_parses_once() {
        let (panel, _, sink) = panel();
        panel.set_url_input("https://jobs.example.com/42");
        panel.handle_url_parse().await;

        let state = panel.state();
        assert!(state.url_input.is_empty());
        assert_eq!(state.text_input, "Platform Engineer\nBuild the platform.");
        assert_eq!(state.success.as_deref(), Some(URL_SUCCESS));

        let parsed = sink.parsed();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0], EchoParser.parse(&state.text_input).unwrap());
    }

    #[tokio::test]
    async fn test_blocked_url_opens_manual_override() {
        let (panel, _, sink) = panel();
        let url = "https://www.linkedin.com/jobs/view/123";
        panel.set_url_input(url);
        panel.handle_url_parse().await;

        let state = panel.state();
        let manual = state.manual_override.expect("manual override shown");
        assert_eq!(manual.url, url);
        assert!(!manual.tips.is_empty());
        assert!(manual.tips.len() <= MAX_TIPS_SHOWN);
        assert!(state.error.is_none());
        assert!(sink.parsed().is_empty());

        panel.dismiss_manual_override();
        assert!(panel.state().manual_override.is_none());
    }

    #[tokio::test]
    async fn test_network_failure_shows_raw_message() {
        let (panel, _, _) = panel();
        panel.set_url_input("https://down.example.com/job");
        panel.handle_url_parse().await;

        let state = panel.state();
        assert_eq!(state.error.as_deref(), Some("HTTP error: 502 Bad Gateway"));
        assert_eq!(state.error_kind, Some(PanelErrorKind::ExtractionFailed));
        assert!(state.manual_override.is_none());
        assert_eq!(state.url_input, "https://down.example.com/job");
    }

    #[tokio::test]
    async fn test_unparseable_url_text_still_fills_text_input() {
        let (panel, _, sink) = panel();
        panel.set_url_input("https://noise.example.com/job");
        panel.handle_url_parse().await;

        let state = panel.state();
        assert_eq!(state.error.as_deref(), Some(PARSE_FAILED));
        assert_eq!(state.error_kind, Some(PanelErrorKind::ParseFailed));
        assert_eq!(state.text_input, "gibberish");
        assert!(state.url_input.is_empty());
        assert!(sink.parsed().is_empty());
    }

    #[tokio::test]
    async fn test_superseded_url_result_is_discarded() {
        let (panel, extractor, sink) = panel();

        panel.set_url_input("https://slow.example.com/job");
        let slow = {
            let panel = panel.clone();
            tokio::spawn(async move { panel.handle_url_parse().await })
        };
        extractor.started.notified().await;

        panel.set_url_input("https://jobs.example.com/fast");
        panel.handle_url_parse().await;

        extractor.release.notify_one();
        slow.await.unwrap();

        let state = panel.state();
        assert_eq!(state.text_input, "Platform Engineer\nBuild the platform.");
        assert!(!state.busy);
        let parsed = sink.parsed();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].title.as_deref(), Some("Platform Engineer"));
    }

    #[tokio::test]
    async fn test_file_rejections_and_failures() {
        let (panel, _, sink) = panel();

        panel
            .handle_file(FileUpload::new("resume.exe", b"MZ".to_vec()))
            .await;
        assert_eq!(panel.state().error.as_deref(), Some(INVALID_FILE));

        let oversized = FileUpload::new("job.txt", vec![b'a'; (MAX_FILE_SIZE + 1) as usize]);
        panel.handle_file(oversized).await;
        assert_eq!(panel.state().error.as_deref(), Some(INVALID_FILE));

        panel
            .handle_file(FileUpload::new("broken.pdf", b"%PDF".to_vec()))
            .await;
        assert_eq!(panel.state().error.as_deref(), Some(FILE_FAILED));
        assert!(sink.parsed().is_empty());
    }

    #[tokio::test]
    async fn test_only_first_dropped_file_is_used() {
        let (panel, _, sink) = panel();
        panel
            .handle_files(vec![
                FileUpload::new("first.txt", b"Backend Engineer\nRust".to_vec()),
                FileUpload::new("second.txt", b"Frontend Engineer\nTypeScript".to_vec()),
            ])
            .await;

        let parsed = sink.parsed();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].title.as_deref(), Some("Backend Engineer"));
        assert_eq!(
            panel.state().success.as_deref(),
            Some("Successfully parsed job description from first.txt")
        );

        panel.handle_files(Vec::new()).await;
        assert_eq!(sink.parsed().len(), 1);
    }
}
