//! Contacts CLI - command line client for the contacts API

mod commands;
mod logging;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use commands::Commands;
use contacts_core::{ClientConfig, FileStorage, SessionStore};
use contacts_http::ApiClient;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{Level, debug, error};

#[derive(Parser)]
#[command(name = "contacts")]
#[command(about = "Manage your contacts from the command line")]
#[command(version)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(short = 'c', long, global = true, env = "CONTACTS_CONFIG")]
    config: Option<PathBuf>,

    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Directory holding the saved session and log file
    #[arg(short = 'd', long, global = true)]
    data_dir: Option<PathBuf>,

    /// Base URL of the contacts API
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(short = 't', long, global = true)]
    timeout: Option<u64>,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    /// Load configuration, letting command line flags win
    fn client_config(&self) -> Result<ClientConfig> {
        let mut config =
            ClientConfig::load(self.config.as_deref()).context("Failed to load configuration")?;

        if let Some(dir) = &self.data_dir {
            config.data_dir.clone_from(dir);
        }
        if let Some(url) = &self.api_url {
            config.api_url.clone_from(url);
        }
        if let Some(timeout) = self.timeout {
            config.timeout_secs = timeout;
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.client_config()?;

    logging::init_logging(cli.log_level.clone().into(), &config.data_dir, cli.no_file_log)?;
    debug!(api_url = %config.api_url, data_dir = %config.data_dir.display(), "Configuration loaded");

    let storage = Arc::new(FileStorage::new(config.session_file()));
    let session = Arc::new(SessionStore::restore(storage));
    let client = ApiClient::from_config(&config, session)?;

    if let Err(e) = cli.command.execute(client, &config, cli.json).await {
        error!("Command failed: {e:#}");
        eprintln!("{e}");
        std::process::exit(1);
    }

    Ok(())
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}
