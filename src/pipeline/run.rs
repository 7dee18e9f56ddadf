// src/pipeline/run.rs

//! One scheduled run: fetch, extract, replace the collection, report.
//!
//! ```text
//! Fetching → Extracting → Deleting → Writing → Reporting(success)
//!     └──────────┴────────────┴──────────┴───→ Reporting(failure)
//! ```
//!
//! Any error before the success record is written, including an error
//! writing it, is reported as a failure. A failure to write the failure
//! record is only logged. There is no retry within a run.

use std::fmt;

use chrono::Utc;

use crate::error::Result;
use crate::models::{Config, JobPosting, RunInfo, RunMetadata};
use crate::pipeline::{RunReporter, StoreSynchronizer};
use crate::services::{JobExtractor, PageFetcher};
use crate::storage::DocumentStore;

/// Step of a run, used in failure logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Fetching,
    Extracting,
    Deleting,
    Writing,
    Reporting,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Fetching => "fetch",
            RunStage::Extracting => "extract",
            RunStage::Deleting => "delete",
            RunStage::Writing => "write",
            RunStage::Reporting => "report",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Postings extracted from the page
    pub found: usize,
    /// Documents removed from the collection
    pub deleted: usize,
    /// Documents written to the collection
    pub written: usize,
    /// Record merged into the metadata document
    pub metadata: RunMetadata,
}

/// A configured sync job bound to a store.
pub struct SyncJob<'a> {
    config: &'a Config,
    store: &'a dyn DocumentStore,
    fetcher: PageFetcher,
    extractor: JobExtractor,
    reporter: RunReporter<'a>,
}

impl<'a> SyncJob<'a> {
    /// Build every component up front so configuration problems surface
    /// before any network activity.
    pub fn new(config: &'a Config, store: &'a dyn DocumentStore, info: RunInfo) -> Result<Self> {
        Ok(Self {
            config,
            store,
            fetcher: PageFetcher::new(&config.scrape)?,
            extractor: JobExtractor::new(&config.extraction, config.defaults.clone())?,
            reporter: RunReporter::new(store, config, info)?,
        })
    }

    /// Fetch the listing page and extract postings.
    pub async fn scrape(&self) -> Result<Vec<JobPosting>> {
        let mut stage = RunStage::Fetching;
        self.scrape_tracked(&mut stage).await
    }

    /// Execute the run and record its outcome.
    ///
    /// Returns the original error when the run fails, after the failure has
    /// been reported.
    pub async fn run(&self) -> Result<RunSummary> {
        let mut stage = RunStage::Fetching;
        let error = match self.execute(&mut stage).await {
            Ok((found, deleted, written)) => {
                stage = RunStage::Reporting;
                match self.reporter.report_success(written).await {
                    Ok(metadata) => {
                        log::info!("Synced {} jobs.", written);
                        return Ok(RunSummary {
                            found,
                            deleted,
                            written,
                            metadata,
                        });
                    }
                    Err(e) => e,
                }
            }
            Err(e) => e,
        };

        log::error!("Scrape failed during {}: {}", stage, error);
        if let Err(secondary) = self.reporter.report_failure(&error).await {
            log::error!(
                "Also failed to update {}: {}",
                self.reporter.path(),
                secondary
            );
        }
        Err(error)
    }

    async fn scrape_tracked(&self, stage: &mut RunStage) -> Result<Vec<JobPosting>> {
        let url = &self.config.scrape.url;
        log::info!("Starting scrape of {}...", url);

        *stage = RunStage::Fetching;
        let html = self.fetcher.fetch(url).await?;

        *stage = RunStage::Extracting;
        Ok(self.extractor.extract(&html, url, Utc::now()))
    }

    async fn execute(&self, stage: &mut RunStage) -> Result<(usize, usize, usize)> {
        let postings = self.scrape_tracked(stage).await?;
        let collection = &self.config.store.jobs_collection;
        log::info!("Found {} jobs. Syncing {}...", postings.len(), collection);

        let sync = StoreSynchronizer::new(self.store, &self.config.store);

        *stage = RunStage::Deleting;
        let deleted = sync.delete_all(collection).await?;
        log::info!("Removed {} existing documents", deleted);

        *stage = RunStage::Writing;
        let written = sync.write_all(collection, &postings).await?;

        Ok((postings.len(), deleted, written))
    }
}
