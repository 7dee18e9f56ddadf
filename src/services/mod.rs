//! Service layer for the sync job.
//!
//! This module contains the business logic for:
//! - Listing page fetching (`PageFetcher`)
//! - Posting extraction (`JobExtractor`)

mod extractor;
mod fetcher;

pub use extractor::JobExtractor;
pub use fetcher::PageFetcher;
