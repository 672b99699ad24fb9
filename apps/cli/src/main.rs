//! rosbot CLI: collect a ros-bot.com account's bot activity.
//!
//! Logs in, fetches one page of the activity feed and prints the legendary
//! and set items it reports.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
