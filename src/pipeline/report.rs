// src/pipeline/report.rs

//! Run status reporting to the metadata record.

use chrono::Utc;
use chrono_tz::Tz;

use crate::error::{AppError, Result};
use crate::models::{Config, RunInfo, RunMetadata};
use crate::storage::DocumentStore;

/// Merges the outcome of a run into the metadata document.
pub struct RunReporter<'a> {
    store: &'a dyn DocumentStore,
    path: String,
    info: RunInfo,
    timezone: Tz,
    max_error_len: usize,
}

impl<'a> RunReporter<'a> {
    pub fn new(store: &'a dyn DocumentStore, config: &Config, info: RunInfo) -> Result<Self> {
        let timezone = config
            .report
            .timezone
            .parse::<Tz>()
            .map_err(|e| AppError::config(format!("report.timezone: {e}")))?;

        Ok(Self {
            store,
            path: config.store.metadata_doc_path.clone(),
            info,
            timezone,
            max_error_len: config.report.max_error_len,
        })
    }

    /// Metadata document path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Record a successful sync of `count` postings.
    pub async fn report_success(&self, count: usize) -> Result<RunMetadata> {
        let metadata = RunMetadata::success(self.info.clone(), Utc::now(), self.timezone, count);
        self.store
            .merge_document(&self.path, metadata.to_fields())
            .await?;
        Ok(metadata)
    }

    /// Record a failed run with its (truncated) error text.
    pub async fn report_failure(&self, error: &AppError) -> Result<RunMetadata> {
        let metadata = RunMetadata::failure(
            self.info.clone(),
            Utc::now(),
            self.timezone,
            &error.to_string(),
            self.max_error_len,
        );
        self.store
            .merge_document(&self.path, metadata.to_fields())
            .await?;
        Ok(metadata)
    }
}
