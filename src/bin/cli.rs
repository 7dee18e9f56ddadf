//! Atlas job board sync CLI
//!
//! Scheduled entry point. With no subcommand it performs one full sync run.

use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use job_sync::{
    error::{AppError, Result},
    models::{Config, RunInfo, ServiceAccount},
    pipeline::SyncJob,
    services::{JobExtractor, PageFetcher},
    storage::{FirestoreStore, MemoryStore},
};

/// job-sync - Atlas job board to Firestore sync
#[derive(Parser, Debug)]
#[command(
    name = "job-sync",
    version,
    about = "Replace the jobs collection with the current job board listings"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape the board and replace the jobs collection (default)
    Run {
        /// Sync into an in-memory store and print the result instead
        #[arg(long)]
        dry_run: bool,
    },

    /// Extract postings without touching the store
    Extract {
        /// Read the listing page from a local file
        #[arg(long, conflicts_with = "url")]
        file: Option<PathBuf>,

        /// Fetch the listing page from this URL (default: configured URL)
        #[arg(long)]
        url: Option<String>,
    },

    /// Validate configuration and credentials
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config)?;
    config.apply_env(env);
    config.validate()?;
    log::debug!("Loaded configuration from {}", cli.config.display());

    match cli.command.unwrap_or(Command::Run { dry_run: false }) {
        Command::Run { dry_run: false } => {
            // Credential problems must stop the run before any network activity.
            let account = ServiceAccount::from_lookup(env).inspect_err(|e| log::error!("{e}"))?;
            let store = FirestoreStore::from_lookup(account, &config.store.database_id, env)?;
            let info = RunInfo::from_lookup(config.report.source.clone(), env);

            SyncJob::new(&config, &store, info)?.run().await?;
        }

        Command::Run { dry_run: true } => {
            log::info!("Dry run: syncing into an in-memory store");
            let store = MemoryStore::new();
            let info = RunInfo::from_lookup(config.report.source.clone(), env);

            let summary = SyncJob::new(&config, &store, info)?.run().await?;

            let documents: serde_json::Map<_, _> = store
                .documents(&config.store.jobs_collection)
                .into_iter()
                .map(|(path, fields)| Ok((path, serde_json::to_value(fields)?)))
                .collect::<Result<_>>()?;
            println!("{}", serde_json::to_string_pretty(&documents)?);
            log::info!(
                "Dry run complete: {} found, {} written",
                summary.found,
                summary.written
            );
        }

        Command::Extract { file, url } => {
            let extractor = JobExtractor::new(&config.extraction, config.defaults.clone())?;
            let (html, source_url) = match file {
                Some(path) => {
                    let html = tokio::fs::read_to_string(&path).await?;
                    (html, url.unwrap_or_else(|| config.scrape.url.clone()))
                }
                None => {
                    let url = url.unwrap_or_else(|| config.scrape.url.clone());
                    let html = PageFetcher::new(&config.scrape)?.fetch(&url).await?;
                    (html, url)
                }
            };

            let postings = extractor.extract(&html, &source_url, Utc::now());
            log::info!("Extracted {} postings", postings.len());
            println!("{}", serde_json::to_string_pretty(&postings)?);
        }

        Command::Validate => {
            log::info!("✓ Configuration OK ({})", cli.config.display());
            match ServiceAccount::from_lookup(env) {
                Ok(account) => log::info!("✓ Credential OK (project {})", account.project_id),
                Err(e) => {
                    log::error!("✗ {e}");
                    return Err(AppError::validation("credential check failed"));
                }
            }
        }
    }

    Ok(())
}
