// src/intake/extractor.rs
use super::service_client::ServiceClient;
use super::validation::FileUpload;
use crate::app_log;
use crate::config::ExtractionConfig;
use crate::error::{ExtractionError, ExtractionErrorKind};
use crate::recovery::{ClassifyError, ErrorKind, GuardError, RecoveryEngine};
use crate::utils::{clean_text, host_matches, truncate_chars, url_host};
use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use scraper::{ElementRef, Html, Selector};
use std::sync::Arc;

/// Breaker guarding job-page fetches from the professional network.
pub const LINKEDIN_JOBS_OPERATION: &str = "linkedin_jobs";

/// Pages yielding less text than this are treated as empty shells.
const MIN_PAGE_TEXT: usize = 100;

const DESCRIPTION_SELECTORS: [&str; 9] = [
    ".jobs-description__container",
    ".jobs-box__html-content",
    ".description__text",
    "[data-test-id='job-description']",
    "#jobDescriptionText",
    "[class*='job-description']",
    "[class*='description']",
    "main",
    "article",
];

const HIDDEN_TAGS: [&str; 6] = ["script", "style", "noscript", "template", "svg", "head"];

const BLOCK_TAGS: [&str; 18] = [
    "p", "div", "br", "li", "ul", "ol", "h1", "h2", "h3", "h4", "h5", "h6", "tr", "section",
    "article", "header", "footer", "main",
];

#[rocket::async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_from_file(&self, file: &FileUpload) -> Result<String, ExtractionError>;

    async fn extract_from_url(&self, url: &str) -> Result<String, ExtractionError>;
}

impl ClassifyError for ExtractionError {
    fn error_kind(&self) -> ErrorKind {
        match self.kind {
            // A refusal from the network is a rate limit as far as the breaker cares.
            ExtractionErrorKind::Blocked => ErrorKind::ApiLimit,
            ExtractionErrorKind::Network => ErrorKind::Network,
            ExtractionErrorKind::Invalid => ErrorKind::Generic,
        }
    }
}

/// Default extractor: local decoding for text files, the conversion service
/// for PDF and Word, and `reqwest` + `scraper` for web pages.
pub struct HttpTextExtractor {
    client: Client,
    conversion: Option<ServiceClient>,
    recovery: Option<Arc<RecoveryEngine>>,
}

impl HttpTextExtractor {
    pub fn new(config: &ExtractionConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout())
            .build()
            .context("Failed to create HTTP client")?;

        let conversion = match &config.conversion_service_url {
            Some(url) => Some(ServiceClient::new(url.clone(), config.timeout())?),
            None => None,
        };

        Ok(Self {
            client,
            conversion,
            recovery: None,
        })
    }

    /// Route professional-network fetches through the recovery engine.
    pub fn with_recovery(mut self, recovery: Arc<RecoveryEngine>) -> Self {
        self.recovery = Some(recovery);
        self
    }

    async fn fetch_page_text(&self, url: &str) -> Result<String, ExtractionError> {
        app_log!(info, "Fetching job page: {}", url);

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ExtractionError::network(format!("Request timed out: {}", url))
            } else {
                ExtractionError::network(format!("Failed to fetch URL: {}", e))
            }
        })?;

        let status = response.status();
        if is_blocking_status(status) {
            let site = url_host(url).unwrap_or_else(|| "This site".to_string());
            return Err(ExtractionError::blocked(format!(
                "{} blocks external requests (HTTP {})",
                site,
                status.as_u16()
            )));
        }
        if !status.is_success() {
            return Err(ExtractionError::network(format!("HTTP error: {}", status)));
        }

        let html = response
            .text()
            .await
            .map_err(|e| ExtractionError::network(format!("Failed to read response body: {}", e)))?;

        let text = html_to_text(&html);
        if text.len() < MIN_PAGE_TEXT {
            return Err(ExtractionError::invalid(
                "No job description text found on the page",
            ));
        }

        app_log!(info, "Extracted {} characters from {}", text.len(), url);
        app_log!(debug, "Page text starts with: {}", truncate_chars(&text, 120));
        Ok(text)
    }
}

#[rocket::async_trait]
impl TextExtractor for HttpTextExtractor {
    async fn extract_from_file(&self, file: &FileUpload) -> Result<String, ExtractionError> {
        match file.extension().as_deref() {
            Some("txt") | Some("md") => decode_text_file(&file.bytes),
            Some("pdf") | Some("doc") | Some("docx") => match &self.conversion {
                Some(service) => {
                    let text = service.extract_text(&file.name, file.bytes.clone()).await?;
                    non_empty(clean_text(&text))
                }
                None => Err(ExtractionError::invalid(
                    "PDF and Word files need the conversion service, which is not configured",
                )),
            },
            _ => Err(ExtractionError::invalid(format!(
                "Cannot extract a job description from {}",
                file.name
            ))),
        }
    }

    async fn extract_from_url(&self, url: &str) -> Result<String, ExtractionError> {
        match (&self.recovery, is_linkedin(url)) {
            (Some(recovery), true) => recovery
                .execute(LINKEDIN_JOBS_OPERATION, url, self.fetch_page_text(url))
                .await
                .map_err(|e| match e {
                    GuardError::CircuitOpen { retry_at, .. } => {
                        let when = retry_at
                            .map(|at| format!(" until {}", at.format("%H:%M:%S UTC")))
                            .unwrap_or_default();
                        ExtractionError::blocked(format!(
                            "LinkedIn requests are paused after repeated failures{}",
                            when
                        ))
                    }
                    GuardError::Failed(inner) => inner,
                }),
            _ => self.fetch_page_text(url).await,
        }
    }
}

fn is_linkedin(url: &str) -> bool {
    url_host(url).is_some_and(|host| host_matches(&host, "linkedin.com"))
}

fn is_blocking_status(status: StatusCode) -> bool {
    // 999 is LinkedIn's answer to non-browser clients.
    matches!(status.as_u16(), 401 | 403 | 429 | 999)
}

fn decode_text_file(bytes: &[u8]) -> Result<String, ExtractionError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| ExtractionError::invalid("File is not valid UTF-8 text"))?;
    non_empty(clean_text(text.trim_start_matches('\u{feff}')))
}

fn non_empty(text: String) -> Result<String, ExtractionError> {
    if text.trim().is_empty() {
        Err(ExtractionError::invalid("No text found in the file"))
    } else {
        Ok(text)
    }
}

/// Visible text of the most specific job-description container on the page.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);

    for selector_str in DESCRIPTION_SELECTORS {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = document.select(&selector).next() {
                let text = element_text(element);
                if text.len() >= MIN_PAGE_TEXT {
                    return text;
                }
            }
        }
    }

    element_text(document.root_element())
}

fn element_text(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    collect_text(element, &mut out);
    clean_text(&out)
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    let name = element.value().name();
    if HIDDEN_TAGS.contains(&name) {
        return;
    }

    let block = BLOCK_TAGS.contains(&name);
    if name == "li" {
        out.push_str("\n- ");
    } else if block {
        out.push('\n');
    }

    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            collect_text(child_element, out);
        } else if let Some(text) = child.value().as_text() {
            out.push_str(text);
        }
    }

    if block {
        out.push('\n');
    }
}
