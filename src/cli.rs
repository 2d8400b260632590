// src/cli.rs
use crate::app_log;
use crate::auth::AuthConfig;
use crate::config::AppConfig;
use crate::intake::{CollectingSink, FileUpload, IntakePanel, PanelState};
use crate::types::{ApplicationData, ParsedJobData};
use crate::web::{start_web_server, AppState};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "jobtrack")]
#[command(about = "Job description intake and error-recovery dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Configuration file (defaults to $JOBTRACK_CONFIG or config.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Parse a job description from a plain text file, as if pasted
    ParseText { file: PathBuf },
    /// Extract and parse job description files; only the first one is used
    ParseFile { files: Vec<PathBuf> },
    /// Fetch a job posting and parse it
    ParseUrl { url: String },
    /// Load the first application from a JSON template
    LoadJson { file: PathBuf },
    /// Issue an admin token for the recovery endpoints
    AdminToken {
        #[arg(long, default_value = "admin")]
        subject: String,
        /// Lifetime in hours (defaults to auth.token_ttl_hours)
        #[arg(long)]
        hours: Option<i64>,
    },
}

#[derive(Serialize)]
struct IntakeReport {
    panel: PanelState,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    jobs: Vec<ParsedJobData>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    applications: Vec<ApplicationData>,
}

pub async fn handle_command(command: Command, config: AppConfig) -> Result<()> {
    match command {
        Command::Serve => start_web_server(config).await,

        Command::AdminToken { subject, hours } => {
            let token = AuthConfig::new(&config.auth).issue_admin_token(&subject, hours)?;
            app_log!(info, "Issued admin token for {}", subject);
            println!("{}", token);
            Ok(())
        }

        Command::ParseText { file } => {
            let text = read_text(&file).await?;
            run_intake(&config, |panel| async move {
                panel.set_text_input(text);
                panel.handle_text_parse();
                panel
            })
            .await
        }

        Command::ParseFile { files } => {
            let mut uploads = Vec::with_capacity(files.len());
            for path in &files {
                uploads.push(read_upload(path).await?);
            }
            run_intake(&config, |panel| async move {
                panel.handle_files(uploads).await;
                panel
            })
            .await
        }

        Command::ParseUrl { url } => {
            run_intake(&config, |panel| async move {
                panel.set_url_input(url);
                panel.handle_url_parse().await;
                panel
            })
            .await
        }

        Command::LoadJson { file } => {
            let upload = read_upload(&file).await?;
            run_intake(&config, |panel| async move {
                panel.handle_file(upload).await;
                panel
            })
            .await
        }
    }
}

async fn run_intake<F, Fut>(config: &AppConfig, action: F) -> Result<()>
where
    F: FnOnce(IntakePanel) -> Fut,
    Fut: std::future::Future<Output = IntakePanel>,
{
    let state = AppState::from_config(config)?;
    let (panel, sink) = state.intake.panel();
    let panel = action(panel).await;

    let report = IntakeReport {
        panel: panel.state(),
        jobs: sink.parsed(),
        applications: sink.applications(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    report_outcome(&report.panel, &sink)
}

fn report_outcome(state: &PanelState, sink: &CollectingSink) -> Result<()> {
    if let Some(manual) = &state.manual_override {
        anyhow::bail!("{} (open {} and paste the text instead)", manual.message, manual.url);
    }
    if let Some(error) = &state.error {
        anyhow::bail!("{}", error);
    }
    app_log!(
        info,
        "Intake finished: {} job(s), {} application(s)",
        sink.parsed().len(),
        sink.applications().len()
    );
    Ok(())
}

async fn read_text(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))
}

async fn read_upload(path: &Path) -> Result<FileUpload> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string();
    Ok(FileUpload::new(name, bytes))
}
