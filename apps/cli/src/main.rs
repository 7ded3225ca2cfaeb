//! scriptcrew CLI: long-form scripts written by a crew of language-model agents.
//!
//! Loads the crew definition and model settings, runs the three-phase
//! pipeline for a category and saves the resulting script.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    // A missing .env is fine; the environment and config file still apply.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
