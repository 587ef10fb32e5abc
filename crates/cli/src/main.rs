mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

use pulse_core::config::{self, Config};

use crate::cli::CliArgs;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    config::load_dotenv();
    let config = Config::from_env();
    config.log_summary();

    commands::run(args.command, &config, args.json).await
}
