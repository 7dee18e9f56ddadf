//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{ListingSelectors, PostingDefaults};
use crate::storage::MAX_BATCH_WRITES;

/// Environment variable overriding [`ScrapeConfig::url`].
pub const ENV_SCRAPE_URL: &str = "SCRAPE_URL";
/// Environment variable overriding [`StoreConfig::jobs_collection`].
pub const ENV_JOBS_COLLECTION: &str = "JOBS_COLLECTION";
/// Environment variable overriding [`StoreConfig::metadata_doc_path`].
pub const ENV_METADATA_DOC_PATH: &str = "METADATA_DOC_PATH";

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Listing page fetch settings
    #[serde(default)]
    pub scrape: ScrapeConfig,

    /// Target collection and batching settings
    #[serde(default)]
    pub store: StoreConfig,

    /// Per-field selector fallback chains
    #[serde(default)]
    pub extraction: ListingSelectors,

    /// Literal values for fields the page does not provide
    #[serde(default)]
    pub defaults: PostingDefaults,

    /// Metadata record settings
    #[serde(default)]
    pub report: ReportConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if the file is absent.
    ///
    /// A file that exists but does not parse is still an error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            log::debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Apply environment overrides.
    ///
    /// Empty values are treated as unset.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get(ENV_SCRAPE_URL) {
            self.scrape.url = url;
        }
        if let Some(collection) = get(ENV_JOBS_COLLECTION) {
            self.store.jobs_collection = collection;
        }
        if let Some(path) = get(ENV_METADATA_DOC_PATH) {
            self.store.metadata_doc_path = path;
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.scrape.user_agent.trim().is_empty() {
            return Err(AppError::validation("scrape.user_agent is empty"));
        }
        if self.scrape.timeout_secs == 0 {
            return Err(AppError::validation("scrape.timeout_secs must be > 0"));
        }
        url::Url::parse(&self.scrape.url)
            .map_err(|e| AppError::validation(format!("scrape.url is invalid: {e}")))?;

        if self.store.batch_chunk == 0 || self.store.batch_chunk > MAX_BATCH_WRITES {
            return Err(AppError::validation(format!(
                "store.batch_chunk must be between 1 and {MAX_BATCH_WRITES}"
            )));
        }
        if segment_count(&self.store.jobs_collection) % 2 != 1 {
            return Err(AppError::validation(format!(
                "store.jobs_collection '{}' is not a collection path",
                self.store.jobs_collection
            )));
        }
        if segment_count(&self.store.metadata_doc_path) % 2 != 0
            || segment_count(&self.store.metadata_doc_path) == 0
        {
            return Err(AppError::validation(format!(
                "store.metadata_doc_path '{}' is not a document path",
                self.store.metadata_doc_path
            )));
        }

        self.extraction.validate()?;

        self.report
            .timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|e| AppError::validation(format!("report.timezone: {e}")))?;
        if self.report.max_error_len == 0 {
            return Err(AppError::validation("report.max_error_len must be > 0"));
        }
        Ok(())
    }
}

/// Number of non-empty `/`-separated segments, or 0 if any segment is empty.
fn segment_count(path: &str) -> usize {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return 0;
    }
    segments.len()
}

/// Listing page fetch settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeConfig {
    /// Job board search URL
    #[serde(default = "defaults::scrape_url")]
    pub url: String,

    /// User-Agent header for the page request
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            url: defaults::scrape_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Document store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Collection holding one document per posting
    #[serde(default = "defaults::jobs_collection")]
    pub jobs_collection: String,

    /// Document receiving the run summary
    #[serde(default = "defaults::metadata_doc_path")]
    pub metadata_doc_path: String,

    /// Documents per batch commit, kept under the store's 500 write limit
    #[serde(default = "defaults::batch_chunk")]
    pub batch_chunk: usize,

    /// Pause between delete batches in milliseconds
    #[serde(default = "defaults::chunk_pause")]
    pub chunk_pause_ms: u64,

    /// Firestore database id
    #[serde(default = "defaults::database_id")]
    pub database_id: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            jobs_collection: defaults::jobs_collection(),
            metadata_doc_path: defaults::metadata_doc_path(),
            batch_chunk: defaults::batch_chunk(),
            chunk_pause_ms: defaults::chunk_pause(),
            database_id: defaults::database_id(),
        }
    }
}

/// Metadata record settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Value of the `source` field
    #[serde(default = "defaults::source")]
    pub source: String,

    /// IANA zone used for the human-readable `timestamp` field
    #[serde(default = "defaults::timezone")]
    pub timezone: String,

    /// Maximum characters of error text kept on failure
    #[serde(default = "defaults::max_error_len")]
    pub max_error_len: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            source: defaults::source(),
            timezone: defaults::timezone(),
            max_error_len: defaults::max_error_len(),
        }
    }
}

mod defaults {
    // Scrape defaults
    pub fn scrape_url() -> String {
        "https://jobboard.ontempworks.com/AtlasJobs/Jobs/Search?Keywords=&Location=&Distance=Twentyfive&SortBy=Date".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Store defaults
    pub fn jobs_collection() -> String {
        "jobs".into()
    }
    pub fn metadata_doc_path() -> String {
        "metadata/sync".into()
    }
    pub fn batch_chunk() -> usize {
        450
    }
    pub fn chunk_pause() -> u64 {
        200
    }
    pub fn database_id() -> String {
        "(default)".into()
    }

    // Report defaults
    pub fn source() -> String {
        "github-actions".into()
    }
    pub fn timezone() -> String {
        "America/Chicago".into()
    }
    pub fn max_error_len() -> usize {
        900
    }
}
