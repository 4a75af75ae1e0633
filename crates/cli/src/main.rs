//! ExamVault command line client
//!
//! A terminal consumer of the ExamVault data layer:
//! - Browse papers, own submissions, leaderboard and dashboard stats
//! - Admin moderation (enable, disable, toggle, delete)
//! - Paper submission with duplicate verification

mod app;
mod commands;
mod output;

use anyhow::Context;
use app::App;
use clap::Parser;
use commands::Command;
use examvault_common::config::{AppConfig, ObservabilityConfig};
use examvault_common::{metrics, AppError};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "examvault", version, about = "Browse, moderate and submit exam papers")]
pub struct Cli {
    /// Configuration file (defaults to config/default + config/{APP_ENV} + config/local)
    #[arg(long, global = true, env = "EXAMVAULT_CONFIG")]
    config: Option<PathBuf>,

    /// Sign in as this email for the command
    #[arg(long, global = true, env = "EXAMVAULT_EMAIL")]
    email: Option<String>,

    /// Display name used at sign-in
    #[arg(long, global = true, env = "EXAMVAULT_NAME")]
    name: Option<String>,

    /// Session file holding the cache between runs (overrides session.snapshot_path)
    #[arg(long, global = true, env = "EXAMVAULT_SESSION")]
    session: Option<PathBuf>,

    /// Serve from a local table (JSON rows or the legacy `||` table) instead of the remote store.
    /// Changes are not written back to the file.
    #[arg(long, global = true)]
    offline: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long, global = true, default_value_t = false)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(&path.to_string_lossy())
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => AppConfig::load().context("Failed to load configuration")?,
    };
    Ok(config)
}

fn init_tracing(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if config.json_logging {
        builder.json().init();
    } else {
        builder.compact().init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    init_tracing(&config.observability);
    metrics::register_metrics();
    info!(version = examvault_common::VERSION, endpoint = %config.remote.endpoint, "Starting examvault");

    let app = App::bootstrap(&cli, config).await?;
    let result = commands::run(&app, cli.command).await;

    // The session is saved even when the command failed
    let persisted = app.persist().await;
    finish(result, persisted)
}

/// The command's own error wins over a failure to save the session
fn finish(result: anyhow::Result<()>, persisted: anyhow::Result<()>) -> anyhow::Result<()> {
    match (result, persisted) {
        (Ok(()), persisted) => persisted,
        (Err(err), persisted) => {
            if let Err(save_err) = persisted {
                warn!(error = %format!("{:#}", save_err), "Session not saved");
            }
            error!(error = %err, "Command failed");
            let message = err
                .downcast_ref::<AppError>()
                .map(AppError::user_message)
                .unwrap_or_else(|| format!("{:#}", err));
            anyhow::bail!(message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use examvault_common::identity::IdentityProvider;
    use examvault_common::Status;

    const TABLE: &str = r#"[
        {"id": "r1", "timestamp": "2024-03-01T10:00:00Z", "year": "3", "semester": "5", "paperCode": "BCS-3011",
         "subjectName": "Operating Systems", "type": "ESE", "status": "Enabled", "branch": "CSE", "email": "a@x.dev"},
        {"id": "r2", "timestamp": "2024-03-02T10:00:00Z", "year": "2", "semester": "3", "paperCode": "BCS-2021",
         "subjectName": "Data Structures", "type": "MSE", "status": "Disabled", "branch": "IT", "email": "b@x.dev"}
    ]"#;

    fn offline_table(name: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("examvault-{}-{}.json", name, std::process::id()));
        std::fs::write(&path, TABLE).unwrap();
        path
    }

    #[test]
    fn command_error_wins_over_session_save_error() {
        let command = Err(anyhow::Error::new(AppError::Forbidden {
            message: "admin only".to_string(),
        }));
        let save = Err(anyhow::anyhow!("disk full"));
        let err = finish(command, save).unwrap_err().to_string();
        assert!(!err.contains("disk full"));
        assert!(err.contains("admin only"));

        let err = finish(Ok(()), Err(anyhow::anyhow!("disk full"))).unwrap_err();
        assert!(err.to_string().contains("disk full"));
        assert!(finish(Ok(()), Ok(())).is_ok());
    }

    #[test]
    fn global_flags_parse_after_the_subcommand() {
        let cli = Cli::try_parse_from([
            "examvault", "browse", "--search", "bcs-30", "--field", "code", "--sort", "year", "--json",
        ])
        .unwrap();
        assert!(cli.json);
        assert!(matches!(cli.command, Command::Browse(_)));
    }

    #[test]
    fn submit_requires_a_branch() {
        let missing = Cli::try_parse_from([
            "examvault", "submit", "--year", "3", "--sem", "5", "--code", "BCS-3011", "--subject", "OS",
        ]);
        assert!(missing.is_err());

        let ok = Cli::try_parse_from([
            "examvault", "submit", "--year", "3", "--sem", "5", "--code", "BCS-3011", "--subject", "OS",
            "--branch", "CSE,IT",
        ]);
        assert!(ok.is_ok());
    }

    #[test]
    fn browse_runs_against_an_offline_table() {
        let path = offline_table("browse");
        let cli = Cli::try_parse_from(["examvault", "--offline", path.to_str().unwrap(), "browse"]).unwrap();

        tokio_test::block_on(async {
            let app = App::bootstrap(&cli, AppConfig::default()).await.unwrap();
            commands::run(&app, cli.command).await.unwrap();

            let public = app.catalog.public(false).await.unwrap();
            assert_eq!(public.len(), 1);
            assert_eq!(public[0].id, "r1");
        });
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn moderation_is_refused_for_non_admins() {
        let path = offline_table("moderation");
        let cli = Cli::try_parse_from([
            "examvault", "--offline", path.to_str().unwrap(), "--email", "student@x.dev", "admin", "enable", "r2",
        ])
        .unwrap();

        tokio_test::block_on(async {
            let app = App::bootstrap(&cli, AppConfig::default()).await.unwrap();
            assert!(!app.identity.require_user().unwrap().is_admin);
            assert!(commands::run(&app, cli.command).await.is_err());
        });
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn admin_enable_updates_the_store() {
        let path = offline_table("enable");
        let cli = Cli::try_parse_from([
            "examvault", "--offline", path.to_str().unwrap(), "--email", "admin@examvault.dev", "admin", "enable", "r2",
        ])
        .unwrap();

        tokio_test::block_on(async {
            let app = App::bootstrap(&cli, AppConfig::default()).await.unwrap();
            commands::run(&app, cli.command).await.unwrap();

            let public = app.catalog.public(true).await.unwrap();
            assert!(public.iter().any(|r| r.id == "r2" && r.status == Status::Enabled));
        });
        std::fs::remove_file(path).ok();
    }
}
