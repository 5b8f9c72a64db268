//! salesweb main entry point

use anyhow::Context;
use clap::Parser;
use salesweb_api::start_server;
use salesweb_config::Config;
use salesweb_core::{JsonDirSource, ReportEngine, ReportSettings};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;

#[derive(Parser, Debug)]
#[command(name = "salesweb")]
#[command(author = "salesweb Contributors")]
#[command(version = "0.1.0")]
#[command(about = "Time-series payment and referral reports", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Print the default configuration and exit
    #[arg(long)]
    print_default_config: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        print!("{}", Config::generate_default());
        return Ok(());
    }

    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.logging.level.as_str()))
        .init();

    log::info!(
        target: "salesweb",
        "Config loaded: data path={}, timezone={}",
        config.data.path.display(),
        config.report.timezone
    );

    let source = JsonDirSource::from_config(&config)?;
    let settings = ReportSettings::from_config(&config)?;
    let engine = Arc::new(ReportEngine::new(Arc::new(source), settings));

    let rt = Runtime::new()?;
    rt.block_on(start_server(config, engine))
}
