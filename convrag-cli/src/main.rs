//! `convrag`: ingest a document for a conversation and query it.

mod cli;
mod commands;
mod telemetry;

use clap::Parser;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    telemetry::init(cli.log_format);

    commands::run(cli.command).await
}
