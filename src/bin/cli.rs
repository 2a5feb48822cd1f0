//! Clinical-trial ingestion CLI
//!
//! Runs the full pipeline once over an inclusive date window.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;
use trial_ingest::{
    error::Result,
    models::Config,
    pipeline::TrialPipeline,
    services::ApiSource,
    storage::StoreKind,
};

/// trial-ingest - Clinical Trial Ingestion Pipeline
#[derive(Parser, Debug)]
#[command(
    name = "trial-ingest",
    version,
    about = "Ingests clinical-trial registry records into a document store"
)]
struct Cli {
    /// First day of the ingestion window (inclusive), YYYY-MM-DD
    start_date: NaiveDate,

    /// Last day of the ingestion window (inclusive), YYYY-MM-DD
    end_date: NaiveDate,

    /// Registry to ingest from
    #[arg(long, default_value = "clinical_trials")]
    source: String,

    /// Document store backend
    #[arg(long, default_value = "mongo")]
    store: String,

    /// Path to the configuration file
    #[arg(short, long, default_value = "data/config.toml")]
    config: PathBuf,

    /// Override the configured page size
    #[arg(long)]
    page_size: Option<u32>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("Trial ingestion starting...");

    let mut config = Config::load_or_default(&cli.config);
    if let Some(page_size) = cli.page_size {
        config.registry.page_size = page_size;
    }
    config.validate()?;

    let source: ApiSource = cli.source.parse()?;
    let store: StoreKind = cli.store.parse()?;

    let pipeline = TrialPipeline::connect(source, store, config).await?;
    let report = pipeline.run(cli.start_date, cli.end_date).await?;

    log::info!(
        "Done! {} pages, {} records fetched, {} written ({} new, {} replaced)",
        report.pages,
        report.fetched,
        report.inserted + report.updated,
        report.inserted,
        report.updated
    );
    if report.truncated {
        log::warn!("Run was truncated by a registry failure; re-run to cover the full window");
    }

    Ok(())
}
