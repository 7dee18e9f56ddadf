//! Job posting data structure.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::{FieldValue, Fields};

/// Stored field holding the server-assigned write time.
pub const SCRAPED_AT_FIELD: &str = "scrapedAt";

/// A job posting scraped from the listing page.
///
/// Postings carry no identity between runs; the store assigns a fresh id on
/// every insert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JobPosting {
    /// Posting title, never empty
    pub title: String,

    /// Hiring company
    pub company: String,

    /// Work location
    pub location: String,

    /// Pay rate as shown on the board
    pub pay_rate: String,

    /// Scan time, ISO-8601 with milliseconds
    pub posted_date: String,

    /// Employment type
    #[serde(rename = "type")]
    pub job_type: String,

    /// Short description
    pub description: String,

    /// Skill tags
    pub skills: Vec<String>,

    /// Required years of experience
    pub years_experience: i64,

    /// Page the posting was scraped from
    pub source_url: String,
}

impl JobPosting {
    /// Convert to stored fields.
    ///
    /// Adds `scrapedAt` as a server timestamp sentinel, resolved by the store
    /// at commit time.
    pub fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("title".into(), self.title.as_str().into());
        fields.insert("company".into(), self.company.as_str().into());
        fields.insert("location".into(), self.location.as_str().into());
        fields.insert("payRate".into(), self.pay_rate.as_str().into());
        fields.insert("postedDate".into(), self.posted_date.as_str().into());
        fields.insert("type".into(), self.job_type.as_str().into());
        fields.insert("description".into(), self.description.as_str().into());
        fields.insert(
            "skills".into(),
            FieldValue::Array(self.skills.iter().map(|s| s.as_str().into()).collect()),
        );
        fields.insert(
            "yearsExperience".into(),
            FieldValue::Integer(self.years_experience),
        );
        fields.insert("sourceUrl".into(), self.source_url.as_str().into());
        fields.insert(SCRAPED_AT_FIELD.into(), FieldValue::ServerTimestamp);
        fields
    }
}

/// Format a timestamp the way the display layer expects (`2026-01-02T03:04:05.678Z`).
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Literal values for posting fields the page does not provide.
///
/// Skills and years of experience are fixed placeholders; the page never provides them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostingDefaults {
    #[serde(default = "defaults::company")]
    pub company: String,

    #[serde(default = "defaults::location")]
    pub location: String,

    #[serde(default = "defaults::pay_rate")]
    pub pay_rate: String,

    #[serde(default = "defaults::job_type")]
    pub job_type: String,

    #[serde(default = "defaults::description")]
    pub description: String,

    #[serde(default = "defaults::skills")]
    pub skills: Vec<String>,

    #[serde(default = "defaults::years_experience")]
    pub years_experience: i64,
}

impl Default for PostingDefaults {
    fn default() -> Self {
        Self {
            company: defaults::company(),
            location: defaults::location(),
            pay_rate: defaults::pay_rate(),
            job_type: defaults::job_type(),
            description: defaults::description(),
            skills: defaults::skills(),
            years_experience: defaults::years_experience(),
        }
    }
}

mod defaults {
    pub fn company() -> String {
        "Atlas Staffing".into()
    }
    pub fn location() -> String {
        "MN".into()
    }
    pub fn pay_rate() -> String {
        "$18.00 / hr".into()
    }
    pub fn job_type() -> String {
        "Full-Time".into()
    }
    pub fn description() -> String {
        "View full details on the Atlas Job Board.".into()
    }
    pub fn skills() -> Vec<String> {
        vec!["Industrial".into(), "Labor".into()]
    }
    pub fn years_experience() -> i64 {
        1
    }
}
