//! BloomKart CLI - storefront client

mod commands;
mod config;
mod logging;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use std::path::PathBuf;
use tracing::{Level, error, info};

#[derive(Parser)]
#[command(name = "bloomkart")]
#[command(about = "Shop the BloomKart flower store from the terminal")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Data directory for the session store and logs
    #[arg(short = 'd', long, global = true, env = "BLOOMKART_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Configuration file (TOML or YAML)
    #[arg(short = 'c', long, global = true, env = "BLOOMKART_CONFIG")]
    config: Option<PathBuf>,

    /// Request timeout in seconds, overriding the configuration
    #[arg(short = 't', long, global = true)]
    timeout: Option<u64>,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::load(cli.config.as_deref(), cli.data_dir, cli.timeout)?;
    logging::init_logging(cli.log_level.into(), &config.data_dir, cli.no_file_log)?;

    info!(base_url = %config.api.base_url, "Starting BloomKart CLI");

    match cli.command.execute(config).await {
        Ok(()) => {
            info!("Command completed successfully");
        }
        Err(e) => {
            error!("Command failed: {e:#}");
            eprintln!("Error: {e:#}");
            std::process::exit(1);
        }
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
