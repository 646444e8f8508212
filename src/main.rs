//! lrn-crawler main entry point
//!
//! This is the command-line interface for the documentation crawler.

use anyhow::Context;
use clap::Parser;
use lrn_crawler::config::{load_config, load_default_config, CrawlOptions};
use lrn_crawler::Orchestrator;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// lrn-crawler: a polite documentation crawler
///
/// Crawls the pages listed by an llms.txt, llms-full.txt or sitemap.xml
/// manifest, saves them as markdown and skips pages that have not changed
/// since the previous run.
#[derive(Parser, Debug)]
#[command(name = "lrn-crawler")]
#[command(version = "1.0.0")]
#[command(about = "A polite documentation crawler", long_about = None)]
struct Cli {
    /// Manifest URL (llms.txt, llms-full.txt or sitemap.xml)
    #[arg(value_name = "URL")]
    url: String,

    /// Follow same-origin links this many levels below the manifest pages
    #[arg(long)]
    depth: Option<u32>,

    /// Requests per second [default: 2]
    #[arg(long)]
    rate: Option<f64>,

    /// Output directory [default: ~/.lrn/crawled/<host>]
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Only crawl URLs matching this glob (repeatable)
    #[arg(long, value_name = "GLOB")]
    include: Vec<String>,

    /// Skip URLs matching this glob (repeatable)
    #[arg(long, value_name = "GLOB")]
    exclude: Vec<String>,

    /// Resolve the manifest and show what would be crawled without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Path to a TOML defaults file [default: ~/.lrn/crawler.toml]
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Stop starting new pages after this many seconds
    #[arg(long, value_name = "SECS")]
    max_duration: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let options = build_options(&cli)?;
    let mut orchestrator = match Orchestrator::new(options) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            tracing::error!("{}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        let report = orchestrator.dry_run().await?;
        print!("{}", report.render());
    } else {
        let summary = orchestrator.run().await?;
        if !cli.quiet {
            print!("{}", summary.render());
        }
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("lrn_crawler=info,warn"),
            1 => EnvFilter::new("lrn_crawler=debug,info"),
            2 => EnvFilter::new("lrn_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Layers defaults, the TOML file and command-line flags
fn build_options(cli: &Cli) -> anyhow::Result<CrawlOptions> {
    let mut options = CrawlOptions::new(&cli.url)?;

    let file = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => load_default_config()?,
    };
    options.apply_file(&file);

    if let Some(depth) = cli.depth {
        options.depth = depth;
    }
    if let Some(rate) = cli.rate {
        options.rate = rate;
    }
    if cli.output.is_some() {
        options.output_dir = cli.output.clone();
    }
    options.include.extend(cli.include.iter().cloned());
    options.exclude.extend(cli.exclude.iter().cloned());
    if let Some(secs) = cli.max_duration {
        options.max_duration = Some(Duration::from_secs(secs));
    }
    options.dry_run = cli.dry_run;
    options.verbose = cli.verbose;
    options.quiet = cli.quiet;

    Ok(options)
}
