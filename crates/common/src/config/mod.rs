//! Configuration management for ExamVault
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Remote record store
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Identity boundary
    #[serde(default)]
    pub identity: IdentityConfig,

    /// Leaderboard view
    #[serde(default)]
    pub leaderboard: LeaderboardConfig,

    /// Client-side input validation
    #[serde(default)]
    pub validation: ValidationConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Session-scoped persisted state
    #[serde(default)]
    pub session: SessionConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RemoteConfig {
    /// Store endpoint; every action goes to this single URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Request timeout in seconds
    #[serde(default = "default_remote_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IdentityConfig {
    /// Emails granted the admin capability at sign-in
    #[serde(default = "default_admin_emails")]
    pub admin_emails: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LeaderboardConfig {
    /// Number of ranked users shown
    #[serde(default = "default_leaderboard_size")]
    pub size: usize,

    /// Submitters never ranked (e.g. the admin's own bulk uploads)
    #[serde(default)]
    pub excluded_emails: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValidationConfig {
    /// Allowed paper-code prefixes
    #[serde(default = "default_paper_code_prefixes")]
    pub paper_code_prefixes: Vec<String>,

    /// Maximum accepted PDF size in bytes
    #[serde(default = "default_max_pdf_bytes")]
    pub max_pdf_bytes: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logging: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Where a host persists the cache snapshot for the current session
    pub snapshot_path: Option<String>,
}

// Default value functions
fn default_endpoint() -> String { "http://localhost:8080/exec".to_string() }
fn default_remote_timeout() -> u64 { 15 }
fn default_admin_emails() -> Vec<String> { vec!["admin@examvault.dev".to_string()] }
fn default_leaderboard_size() -> usize { crate::DEFAULT_LEADERBOARD_SIZE }
fn default_paper_code_prefixes() -> Vec<String> {
    ["BCS", "BIT", "BEC", "BEE", "BME", "BCE", "BAS", "BMA", "BHU"]
        .iter()
        .map(|p| p.to_string())
        .collect()
}
fn default_max_pdf_bytes() -> u64 { 10 * 1024 * 1024 }
fn default_log_level() -> String { "info".to_string() }

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_remote_timeout(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self { admin_emails: default_admin_emails() }
    }
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self {
            size: default_leaderboard_size(),
            excluded_emails: Vec::new(),
        }
    }
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            paper_code_prefixes: default_paper_code_prefixes(),
            max_pdf_bytes: default_max_pdf_bytes(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., APP__REMOTE__ENDPOINT=https://...
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("identity.admin_emails")
                    .with_list_parse_key("leaderboard.excluded_emails")
                    .with_list_parse_key("validation.paper_code_prefixes"),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific file, still honouring APP__ overrides
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Remote request timeout as Duration
    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            remote: RemoteConfig::default(),
            identity: IdentityConfig::default(),
            leaderboard: LeaderboardConfig::default(),
            validation: ValidationConfig::default(),
            observability: ObservabilityConfig::default(),
            session: SessionConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.leaderboard.size, 10);
        assert_eq!(config.remote_timeout(), Duration::from_secs(15));
        assert_eq!(config.identity.admin_emails.len(), 1);
        assert!(config.validation.paper_code_prefixes.contains(&"BCS".to_string()));
    }

    #[test]
    fn test_partial_sections_fill_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{"remote": {"endpoint": "https://store.example/exec"}}"#,
        )
        .unwrap();
        assert_eq!(config.remote.endpoint, "https://store.example/exec");
        assert_eq!(config.remote.timeout_secs, 15);
        assert_eq!(config.observability.log_level, "info");
        assert!(config.session.snapshot_path.is_none());
    }
}
