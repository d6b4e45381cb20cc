use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use epg_grabber::{
    config::{Config, defaults::DEFAULT_CONFIG_FILE},
    ingestor::{EpgGrabber, RunOptions},
};

#[derive(Parser)]
#[command(name = "epg-grabber")]
#[command(version)]
#[command(about = "Fetch EPG sources and merge them into a single XMLTV file")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CONFIG_FILE", default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Output file (overrides config file)
    #[arg(short, long, env = "OUTPUT_FILE", value_name = "PATH")]
    output: Option<PathBuf>,

    /// Channel mapping file (overrides config file)
    #[arg(short, long, env = "MAPPING_FILE", value_name = "PATH")]
    mappings: Option<PathBuf>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    /// Run everything but do not write the output file
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging with specified level
    let log_filter = format!("epg_grabber={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("Starting EPG grabber v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::load_from_file(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    info!("Configuration loaded from: {}", cli.config.display());

    config.apply_overrides(cli.output, cli.mappings);

    let grabber = EpgGrabber::from_config(config)?;
    let report = grabber.run(RunOptions { dry_run: cli.dry_run }).await?;

    info!(
        "EPG grab finished: {} channels, {} programmes",
        report.channels_written, report.programs_written
    );
    Ok(())
}
