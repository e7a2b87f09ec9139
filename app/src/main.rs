use std::fs;
use std::path::{Path, PathBuf};

use chill_core::config::{ClientConfig, ConfigError, FileConfigStore};
use clap::Parser;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "chill=info,chill_core=info,chill_adapters=info,chill_tui=info";

#[derive(Debug, Parser)]
#[command(name = "chill", version, about = "Browse a remote text-over-HTTP data store")]
struct Cli {
    /// Config file to load instead of the per-user default.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long, env = "CHILL_BASE_URL", value_name = "URL")]
    base_url: Option<String>,
    #[arg(long, value_name = "SECONDS")]
    timeout: Option<u64>,
    /// Directory for log files. Nothing is written to the terminal.
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to create log directory at {path}: {source}")]
    LogDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

struct Settings {
    config: ClientConfig,
    log_dir: PathBuf,
}

fn load_settings(cli: &Cli) -> Result<Settings, AppError> {
    let store = match &cli.config {
        Some(path) => FileConfigStore::load_from_path(path)?,
        None => FileConfigStore::load_default()?,
    };
    let default_log_dir = default_log_dir(store.path());
    let mut config = store.into_config();

    if let Some(base_url) = &cli.base_url {
        config.base_url.clone_from(base_url);
    }
    if let Some(timeout) = cli.timeout {
        config.request_timeout_secs = timeout;
    }
    let log_dir = cli
        .log_dir
        .clone()
        .or_else(|| config.log_dir.clone())
        .unwrap_or(default_log_dir);

    Ok(Settings { config, log_dir })
}

fn default_log_dir(config_path: &Path) -> PathBuf {
    config_path
        .parent()
        .map_or_else(|| PathBuf::from("logs"), |dir| dir.join("logs"))
}

fn init_logging(log_dir: &Path) -> Result<WorkerGuard, AppError> {
    fs::create_dir_all(log_dir).map_err(|source| AppError::LogDir {
        path: log_dir.to_path_buf(),
        source,
    })?;

    let filter = EnvFilter::try_from_env("CHILL_LOG")
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let file_appender = tracing_appender::rolling::daily(log_dir, "chill.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(file_writer)
                .with_ansi(false)
                .with_filter(filter),
        )
        .init();

    Ok(guard)
}

fn run_app(
    config: &ClientConfig,
    run_tui: impl FnOnce(&ClientConfig) -> Result<(), chill_tui::TuiError>,
) -> Result<(), Box<dyn std::error::Error>> {
    tracing::info!(
        base_url = config.base_url(),
        timeout_secs = config.request_timeout_secs,
        "starting"
    );
    run_tui(config)?;
    tracing::info!("exited cleanly");
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    let _log_guard = init_logging(&settings.log_dir)?;
    run_app(&settings.config, chill_tui::run)
}
