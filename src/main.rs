mod auth;
mod cli;
mod config;
mod error;
mod metrics;
mod prompt;
mod providers;
mod records;
mod report;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use log::info;

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    info!("Starting dora-report");
    cli.execute().await?;

    Ok(())
}
