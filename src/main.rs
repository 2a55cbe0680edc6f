//! paperfeed - most-tweeted research papers per category
//!
//! Fetches paper popularity rankings from papers.labml.ai, groups them by
//! category, caches the result next to the caller, and prints a summary.

use std::io::{self, Write};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use paperfeed::cli::{Cli, OutputFormat, RunConfig};
use paperfeed::data::{FetchOutcome, PaperFeedClient};

/// Installs the stderr log subscriber; `RUST_LOG` wins over `-v`
fn init_logging(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Writes the per-bucket summary
fn print_summary(out: &mut impl Write, outcome: &FetchOutcome, top: usize) -> io::Result<()> {
    writeln!(out, "Source: {}", outcome.source)?;

    for category in outcome.feed.categories() {
        writeln!(out, "{}", category)?;
        for mode in outcome.feed.modes(category) {
            let papers = outcome.feed.papers(category, mode);
            writeln!(out, "  {} ({} papers)", mode, papers.len())?;
            for paper in papers.iter().take(top) {
                let title = paper.title().unwrap_or("<untitled>");
                writeln!(out, "    {:>6}  {}", paper.num_tweets(), title)?;
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Validate modes before the auth handshake hits the network
    let config = RunConfig::from_cli(&cli)?;
    init_logging(config.log_filter());

    let client = PaperFeedClient::connect(config.feed.clone()).await?;
    let outcome = client
        .fetch_papers(&config.mode_names(), config.papers_per_mode, config.persist)
        .await?;

    let mut stdout = io::stdout().lock();
    match config.output {
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut stdout, &outcome.feed)?;
            writeln!(stdout)?;
        }
        OutputFormat::Summary { top } => print_summary(&mut stdout, &outcome, top)?,
    }

    Ok(())
}
