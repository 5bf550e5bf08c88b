//! get-papers-list - PubMed papers with industry authors
//!
//! Searches PubMed, keeps papers with at least one non-academic author and
//! writes them as CSV.
//!
//! ## Usage
//!
//! ```bash
//! get-papers-list "cancer immunotherapy" --file results.csv --debug
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use pubmed_industry::{
    extractor,
    fetcher::{PubMedClient, DEFAULT_BASE_URL, DEFAULT_MAX_RESULTS},
    writer,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, info, Level};
use tracing_subscriber::{fmt, EnvFilter};

// ============================================================================
// CLI Definition
// ============================================================================

/// Fetch PubMed papers with non-academic authors from biotech/pharma companies.
#[derive(Parser)]
#[command(name = "get-papers-list")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Search query for PubMed
    query: String,

    /// Output CSV filename (prints to console if omitted)
    #[arg(short, long)]
    file: Option<PathBuf>,

    /// Print debug info
    #[arg(short, long)]
    debug: bool,

    /// Maximum number of PubMed IDs to retrieve
    #[arg(short = 'n', long, default_value_t = DEFAULT_MAX_RESULTS,
          value_parser = parse_max_results)]
    max_results: usize,

    /// NCBI API key for higher rate limits
    #[arg(long, env = "NCBI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// E-utilities base URL
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,
}

fn parse_max_results(s: &str) -> std::result::Result<usize, String> {
    let n: usize = s.parse().map_err(|_| format!("'{}' is not a number", s))?;
    if n == 0 {
        return Err("must be at least 1".to_string());
    }
    Ok(n)
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { Level::DEBUG } else { Level::WARN };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string()));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

async fn run(cli: &Cli) -> Result<()> {
    info!(query = %cli.query, "Query");
    if let Some(file) = &cli.file {
        info!(file = %file.display(), "Output file");
    }

    let client = PubMedClient::with_base_url(&cli.base_url)
        .context("Failed to create PubMed client")?
        .with_api_key(cli.api_key.clone());

    let ids = client
        .search(&cli.query, cli.max_results)
        .await
        .context("PubMed search failed")?;
    info!(count = ids.len(), "Found PubMed IDs");

    let papers = if ids.is_empty() {
        debug!("Search returned no IDs, skipping detail fetch");
        Vec::new()
    } else {
        let xml = client
            .fetch_details(&ids)
            .await
            .context("Failed to fetch article details")?;
        extractor::extract_paper_data(&xml).context("Failed to parse article details")?
    };

    if papers.is_empty() {
        println!("No non-academic authors found.");
        return Ok(());
    }

    info!(papers = papers.len(), "Papers with non-academic authors");
    writer::write_csv(&papers, cli.file.as_deref()).context("Failed to write CSV")?;
    Ok(())
}
