//! Run summary published to the metadata record.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::models::iso_timestamp;
use crate::storage::{FieldValue, Fields};
use crate::utils::text::truncate_chars;

/// Environment variable carrying the CI run id.
pub const ENV_RUN_ID: &str = "GITHUB_RUN_ID";
/// Environment variable carrying the commit hash.
pub const ENV_SHA: &str = "GITHUB_SHA";

/// Outcome recorded for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Success,
    Failure,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Success => "success",
            RunStatus::Failure => "failure",
        }
    }
}

/// Identifiers of the invocation, copied into every metadata write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInfo {
    pub source: String,
    pub run_id: Option<String>,
    pub sha: Option<String>,
}

impl RunInfo {
    /// Build from a source label and an environment lookup.
    pub fn from_lookup<F>(source: impl Into<String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            source: source.into(),
            run_id: get(ENV_RUN_ID),
            sha: get(ENV_SHA),
        }
    }
}

/// A single metadata write.
///
/// Written with merge semantics: `count` and `error` are only present for
/// their own status and do not clear each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunMetadata {
    pub info: RunInfo,
    pub timestamp: String,
    pub timestamp_iso: String,
    pub status: RunStatus,
    pub count: Option<usize>,
    pub error: Option<String>,
}

impl RunMetadata {
    /// Summary of a run that synced `count` postings.
    pub fn success(info: RunInfo, at: DateTime<Utc>, tz: Tz, count: usize) -> Self {
        Self {
            info,
            timestamp: local_timestamp(at, tz),
            timestamp_iso: iso_timestamp(at),
            status: RunStatus::Success,
            count: Some(count),
            error: None,
        }
    }

    /// Summary of a failed run, keeping at most `max_error_len` characters of the error.
    pub fn failure(
        info: RunInfo,
        at: DateTime<Utc>,
        tz: Tz,
        message: &str,
        max_error_len: usize,
    ) -> Self {
        Self {
            info,
            timestamp: local_timestamp(at, tz),
            timestamp_iso: iso_timestamp(at),
            status: RunStatus::Failure,
            count: None,
            error: Some(truncate_chars(message, max_error_len).to_string()),
        }
    }

    /// Convert to stored fields.
    pub fn to_fields(&self) -> Fields {
        let optional = |value: &Option<String>| match value {
            Some(v) => FieldValue::from(v.as_str()),
            None => FieldValue::Null,
        };

        let mut fields = Fields::new();
        fields.insert("source".into(), self.info.source.as_str().into());
        fields.insert("runId".into(), optional(&self.info.run_id));
        fields.insert("sha".into(), optional(&self.info.sha));
        fields.insert("timestamp".into(), self.timestamp.as_str().into());
        fields.insert("timestampISO".into(), self.timestamp_iso.as_str().into());
        fields.insert("status".into(), self.status.as_str().into());
        if let Some(count) = self.count {
            fields.insert("count".into(), FieldValue::Integer(count as i64));
        }
        if let Some(error) = &self.error {
            fields.insert("error".into(), error.as_str().into());
        }
        fields
    }
}

/// US-style local time, e.g. `1/5/2026, 8:30:00 AM`.
pub fn local_timestamp(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz)
        .format("%-m/%-d/%Y, %-I:%M:%S %p")
        .to_string()
}
