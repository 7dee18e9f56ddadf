// src/models/selectors.rs

//! CSS selector chains for scraping the job listing page.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Ordered selector chains for each extracted field.
///
/// Listing selectors are combined: an element matching any of them is a
/// listing, reported once, in document order. Field selectors are tried in
/// order within a listing and the first one yielding non-empty text wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingSelectors {
    /// Selectors for each job listing element
    #[serde(default = "defaults::listing")]
    pub listing: Vec<String>,

    /// Selectors for the title within a listing
    #[serde(default = "defaults::title")]
    pub title: Vec<String>,

    /// Selectors for the location within a listing
    #[serde(default = "defaults::location")]
    pub location: Vec<String>,

    /// Selectors for the pay rate within a listing
    #[serde(default = "defaults::pay_rate")]
    pub pay_rate: Vec<String>,

    /// Selectors for the description within a listing
    #[serde(default = "defaults::description")]
    pub description: Vec<String>,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            listing: defaults::listing(),
            title: defaults::title(),
            location: defaults::location(),
            pay_rate: defaults::pay_rate(),
            description: defaults::description(),
        }
    }
}

impl ListingSelectors {
    /// Each chain paired with its field name.
    pub fn chains(&self) -> [(&'static str, &[String]); 5] {
        [
            ("listing", self.listing.as_slice()),
            ("title", self.title.as_slice()),
            ("location", self.location.as_slice()),
            ("pay_rate", self.pay_rate.as_slice()),
            ("description", self.description.as_slice()),
        ]
    }

    /// Reject empty chains and blank selectors.
    pub fn validate(&self) -> Result<()> {
        for (field, chain) in self.chains() {
            if chain.is_empty() {
                return Err(AppError::validation(format!(
                    "extraction.{field} has no selectors"
                )));
            }
            if chain.iter().any(|s| s.trim().is_empty()) {
                return Err(AppError::validation(format!(
                    "extraction.{field} contains a blank selector"
                )));
            }
        }
        Ok(())
    }
}

mod defaults {
    fn owned(selectors: &[&str]) -> Vec<String> {
        selectors.iter().map(|s| s.to_string()).collect()
    }

    pub fn listing() -> Vec<String> {
        owned(&[".job-listing-item", ".job-listing", ".job-item", "tr.job-row"])
    }
    pub fn title() -> Vec<String> {
        owned(&[".job-title", "a.title", "a.job-title"])
    }
    pub fn location() -> Vec<String> {
        owned(&[".location", ".job-location"])
    }
    pub fn pay_rate() -> Vec<String> {
        owned(&[".pay", ".salary"])
    }
    pub fn description() -> Vec<String> {
        owned(&[".description", ".summary"])
    }
}
