//! SiteSage CLI — site ingestion and conversational QA.
//!
//! Crawls a site's sitemap, publishes the captured content as a hosted
//! knowledge base, and answers questions against it.

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
