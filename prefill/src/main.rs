//! Galaxy prefill - populate a platform instance with synthetic data.

#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use clap::Parser;
use prefill::Orchestrator;
use prefill_common::{LogConfig, init_logging, load_config};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "prefill")]
#[command(author, version, about = "Fill a Galaxy API instance with synthetic users, games, friends and purchases")]
struct Cli {
    /// Path to a TOML config file (else PREFILL_CONFIG, else ./prefill.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Fetch each created game's detail record after the run
    #[arg(long)]
    verify: bool,
}

#[tokio::main]
async fn main() {
    if let Err(err) = run(Cli::parse()).await {
        eprintln!("error: {err:#} stack trace: {err:?}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut log_config = LogConfig::from_env("info").with_stderr();
    if cli.verbose {
        log_config = log_config.with_level("debug");
    }
    let _logging_guards = init_logging(&log_config).context("failed to initialize logging")?;

    let config = load_config(cli.config.as_deref()).context("failed to load configuration")?;
    let orchestrator =
        Orchestrator::from_config(config).context("failed to build HTTP clients")?;

    let summary = orchestrator.run().await?;
    info!(%summary, "prefill complete");

    if cli.verify {
        let details = orchestrator
            .verify_games(&summary.game_slugs)
            .await
            .context("game verification failed")?;
        info!(count = details.len(), "all created games resolve");
    }

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
