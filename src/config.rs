// src/config.rs
use crate::recovery::RecoveryConfig;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Application configuration for one environment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub extraction: ExtractionConfig,
    pub recovery: RecoveryConfig,
    pub dashboard: DashboardConfig,
    pub auth: AuthSettings,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub address: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Base URL of the document conversion service used for PDF and Word files.
    pub conversion_service_url: Option<String>,
    pub timeout_seconds: u64,
    pub user_agent: String,
    pub max_file_size: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            conversion_service_url: None,
            timeout_seconds: 30,
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            max_file_size: crate::intake::validation::MAX_FILE_SIZE,
        }
    }
}

impl ExtractionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub poll_interval_secs: u64,
    pub compact_poll_interval_secs: u64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
            compact_poll_interval_secs: 10,
        }
    }
}

impl DashboardConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn compact_poll_interval(&self) -> Duration {
        Duration::from_secs(self.compact_poll_interval_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    /// HS256 secret for admin capability tokens. Admin routes are closed when unset.
    pub admin_jwt_secret: Option<String>,
    pub token_ttl_hours: i64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            admin_jwt_secret: None,
            token_ttl_hours: 12,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: PathBuf,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("/tmp/jobtrack.log"),
            filter: "job_tracker=info,rocket::server=off".to_string(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    local: AppConfig,
    production: AppConfig,
}

impl AppConfig {
    /// Load configuration based on environment
    pub fn load() -> Result<Self> {
        Self::load_with(None)
    }

    /// Like [`AppConfig::load`], with an explicit file taking precedence over `JOBTRACK_CONFIG`.
    pub fn load_with(path: Option<PathBuf>) -> Result<Self> {
        let environment = Self::get_environment();
        let path = path.unwrap_or_else(|| {
            std::env::var("JOBTRACK_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_FILE))
        });

        info!("Loading configuration for environment: {}", environment);

        let mut config = if path.exists() {
            Self::load_from_file(&path, &environment)?
        } else {
            warn!(
                "{} not found, using built-in defaults",
                path.display()
            );
            Self::default()
        };

        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn get_environment() -> String {
        std::env::var("JOBTRACK_ENV")
            .or_else(|_| std::env::var("ENVIRONMENT"))
            .or_else(|_| std::env::var("ENV"))
            .unwrap_or_else(|_| "local".to_string())
    }

    pub fn load_from_file(path: &Path, environment: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let config_file: ConfigFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(match environment {
            "production" => config_file.production,
            _ => config_file.local,
        })
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(port) = std::env::var("ROCKET_PORT") {
            self.server.port = port
                .parse::<u16>()
                .map_err(|_| anyhow::anyhow!("ROCKET_PORT must be a valid port number"))?;
        }

        if let Ok(url) = std::env::var("CONVERSION_SERVICE_URL") {
            self.extraction.conversion_service_url = Some(url);
        }

        if let Ok(secret) = std::env::var("ADMIN_JWT_SECRET") {
            self.auth.admin_jwt_secret = Some(secret);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.dashboard.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.dashboard.compact_poll_interval(), Duration::from_secs(10));
        assert_eq!(config.extraction.max_file_size, 5 * 1024 * 1024);
        assert!(config.auth.admin_jwt_secret.is_none());
    }

    #[test]
    fn test_load_selects_environment_section() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "local:\n  server:\n    port: 9001\nproduction:\n  server:\n    port: 80\n  recovery:\n    failure_threshold: 3\n"
        )
        .unwrap();

        let local = AppConfig::load_from_file(file.path(), "local").unwrap();
        assert_eq!(local.server.port, 9001);
        assert_eq!(local.recovery.failure_threshold, 5);

        let production = AppConfig::load_from_file(file.path(), "production").unwrap();
        assert_eq!(production.server.port, 80);
        assert_eq!(production.recovery.failure_threshold, 3);
        assert_eq!(production.dashboard.poll_interval_secs, 5);
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "local: [unclosed").unwrap();
        assert!(AppConfig::load_from_file(file.path(), "local").is_err());
    }
}
