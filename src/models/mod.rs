// src/models/mod.rs

//! Domain models for the sync job.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod credentials;
mod metadata;
mod posting;
mod selectors;

// Re-export all public types
pub use config::{
    Config, ENV_JOBS_COLLECTION, ENV_METADATA_DOC_PATH, ENV_SCRAPE_URL, ReportConfig,
    ScrapeConfig, StoreConfig,
};
pub use credentials::{ENV_SERVICE_ACCOUNT, ServiceAccount};
pub use metadata::{ENV_RUN_ID, ENV_SHA, RunInfo, RunMetadata, RunStatus, local_timestamp};
pub use posting::{JobPosting, PostingDefaults, SCRAPED_AT_FIELD, iso_timestamp};
pub use selectors::ListingSelectors;
