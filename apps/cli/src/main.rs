//! Support Copilot CLI: grounded customer-support replies in three passes.
//!
//! Drafts an answer from a knowledge base, has a second model review it,
//! then writes the final email incorporating the review.

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
