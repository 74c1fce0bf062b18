//! `metafetch`: crawl one page and print its metadata as JSON.
//!
//! Shares configuration and caches with the server, so a lookup here warms
//! the same response and robots caches.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use metafetch_client::{CrawlError, MetadataService};
use metafetch_core::{AppConfig, Caches, Problem};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "metafetch", version)]
#[command(about = "Fetch the OGP and HTML metadata of a page", long_about = None)]
struct Cli {
    /// Page URL (http or https)
    url: String,

    /// Preferred language, sent as Accept-Language
    #[arg(long)]
    lang: Option<String>,

    /// Crawl even when a fresh cached result exists
    #[arg(long)]
    no_cache: bool,

    /// Print single-line JSON
    #[arg(long)]
    compact: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let config = AppConfig::load()?;
    let caches = Caches::open(&config).await?;
    let service = MetadataService::from_config(&config, &caches)?;

    let outcome = if cli.no_cache {
        service.get_uncached(&cli.url, cli.lang.as_deref()).await
    } else {
        service.get(&cli.url, cli.lang.as_deref()).await.map(|lookup| {
            tracing::debug!(cache = %lookup.cache, "lookup finished");
            lookup.result
        })
    };

    match outcome {
        Ok(result) => {
            println!("{}", render(&result.metadata, cli.compact)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            eprintln!("{}", render(&problem(&err), cli.compact)?);
            Ok(exit_code(&err))
        }
    }
}

fn render<T: Serialize>(value: &T, compact: bool) -> serde_json::Result<String> {
    if compact { serde_json::to_string(value) } else { serde_json::to_string_pretty(value) }
}

fn problem(err: &CrawlError) -> Problem {
    match err {
        CrawlError::InvalidUrl(e) => Problem::new("Incorrect 'url' parameter.", e.to_string()),
        CrawlError::Denied(rejection) => Problem::new(rejection.title(), rejection.detail()),
        CrawlError::Transport(e) => Problem::new("Fetch failed.", e.to_string()),
    }
}

/// 2 for bad input, 3 for a refused page, 1 for network faults.
fn exit_code(err: &CrawlError) -> ExitCode {
    match err {
        CrawlError::InvalidUrl(_) => ExitCode::from(2),
        CrawlError::Denied(_) => ExitCode::from(3),
        CrawlError::Transport(_) => ExitCode::FAILURE,
    }
}
