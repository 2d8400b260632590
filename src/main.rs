use anyhow::{Context, Result};
use clap::Parser;
use job_tracker::app_log;
use job_tracker::cli::{handle_command, Cli, Command};
use job_tracker::config::{AppConfig, LoggingConfig};
use std::fs::OpenOptions;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

#[rocket::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_with(cli.config.clone())?;

    init_logging(&config.logging)?;

    app_log!(info, "Environment: {}", AppConfig::get_environment());

    handle_command(cli.command.unwrap_or(Command::Serve), config).await
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&logging.file)
        .with_context(|| format!("Failed to open log file {}", logging.file.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.filter))
        .context("Invalid log filter")?;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .json()
                .with_writer(file)
                .with_current_span(false)
                .with_span_list(false),
        )
        .with(filter)
        .init();

    Ok(())
}
