// src/error.rs

//! Unified error handling for the sync job.
//!
//! Errors fall into three groups that the run driver treats differently:
//!
//! - configuration errors (`Config`, `Credentials`, `Validation`, `Toml`,
//!   `Selector`) stop the process before any network activity;
//! - fetch errors (`Fetch`, `Http`) and store errors (`Store`, `Auth`)
//!   are reported to the metadata record and then fail the run.

use std::fmt;

use thiserror::Error;

/// Result type alias for sync operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed below the fetch layer (client construction, store transport)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// Token signing failed
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing or malformed service-account credential
    #[error("Credential error: {0}")]
    Credentials(String),

    /// Configuration validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Fetching the listing page failed
    #[error("Fetch failed for {url}: {message}")]
    Fetch { url: String, message: String },

    /// Obtaining a store access token failed
    #[error("Auth error: {0}")]
    Auth(String),

    /// A document store operation failed
    #[error("Store error during {operation}: {message}")]
    Store { operation: String, message: String },
}

impl AppError {
    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a credential error.
    pub fn credentials(message: impl Into<String>) -> Self {
        Self::Credentials(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a fetch error for a URL.
    pub fn fetch(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Create an auth error.
    pub fn auth(message: impl fmt::Display) -> Self {
        Self::Auth(message.to_string())
    }

    /// Create a store error with the failing operation.
    pub fn store(operation: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Store {
            operation: operation.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error is fatal before any work starts.
    ///
    /// Such errors never produce a metadata record.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Self::Config(_)
                | Self::Credentials(_)
                | Self::Validation(_)
                | Self::Toml(_)
                | Self::Selector { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_message_includes_url() {
        let err = AppError::fetch("https://example.com/jobs", "request timed out after 30s");
        assert_eq!(
            err.to_string(),
            "Fetch failed for https://example.com/jobs: request timed out after 30s"
        );
    }

    #[test]
    fn test_is_config() {
        assert!(AppError::credentials("missing").is_config());
        assert!(AppError::selector("[[", "bad").is_config());
        assert!(!AppError::store("commit", "quota exceeded").is_config());
        assert!(!AppError::fetch("u", "m").is_config());
    }
}
