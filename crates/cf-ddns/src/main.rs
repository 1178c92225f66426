//! Command-line entry point for **cf-ddns**
//!
//! * Loads `.env` (if present) into the process environment
//! * Parses `--config` (or `CF_DDNS_CONFIG`) and `--once`
//! * Sets up tracing with a compact formatter
//! * Boots the core logic defined in `cf_ddns_core`

use anyhow::Result;
use cf_ddns_core::{RunMode, bootstrap, load_config};
use clap::Parser;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// CLI options
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Path to the config file (optional; environment variables are used if absent)
    #[arg(short, long, env = "CF_DDNS_CONFIG", default_value = "cf-ddns.toml")]
    config: String,

    /// Run a single reconciliation cycle and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // before clap, so `.env` can provide CF_DDNS_CONFIG too
    let dotenv = dotenvy::dotenv();
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tokio_cron_scheduler=warn")),
        )
        .with(fmt::layer().compact())
        .init();

    match dotenv {
        Ok(path) => tracing::debug!("loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("ignoring unreadable .env: {e}"),
    }

    let cfg = load_config(&cli.config)?;
    let mode = if cli.once {
        RunMode::Once
    } else {
        RunMode::Scheduled
    };
    bootstrap(cfg, mode).await
}
