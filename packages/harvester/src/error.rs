//! Error types for the harvester.
//!
//! `HarvesterError` is the library-level error. Fetch failures have their own
//! typed `FetchError` so the retry policy can tell transient failures from
//! permanent ones, and `ErrorKind` is the serializable partition that ends up
//! in recorded results and run summaries.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::PlatformTag;

/// Main error type for the harvester library.
#[derive(Debug, Error)]
pub enum HarvesterError {
    /// No platform tag, or no extractor registered for the tag.
    #[error("No extractor registered for platform '{platform}' ({url})")]
    Classification { platform: PlatformTag, url: String },

    /// Page load failed.
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// All retry attempts for a transient failure were used up.
    #[error("Giving up after {attempts} attempts: {message}")]
    RetriesExhausted { attempts: u32, message: String },

    /// The fetched document does not have the expected structure.
    #[error("Extraction failed for {url}: {reason}")]
    Extraction { url: String, reason: String },

    /// The renderer rejected the chapter.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The municipality list could not be written.
    #[error("Failed to persist municipality list for {state} at {path}: {source}")]
    CachePersistence {
        state: String,
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// A cached municipality list is readable but not a valid list.
    #[error("Invalid municipality cache {path}: {reason}")]
    InvalidCache { path: String, reason: String },

    /// Invalid state code.
    #[error("Invalid state code: '{0}'. Expected a two-letter code (e.g., UT)")]
    InvalidStateCode(String),

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The run was stopped before the municipality finished.
    #[error("Cancelled by stop signal")]
    Cancelled,

    /// HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML serialization error.
    #[error("YAML serialization failed: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl HarvesterError {
    /// Shorthand for an extraction failure.
    pub fn extraction(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Extraction {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// The recorded partition this error falls into, when it is recorded
    /// per municipality.
    ///
    /// Fetch failures, exhausted retries and cancellation are all recorded as
    /// extraction errors.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Classification { .. } => ErrorKind::Classification,
            Self::Render(_) => ErrorKind::Render,
            _ => ErrorKind::Extraction,
        }
    }
}

/// Failure raised by the page-fetching layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Page load did not finish within the configured timeout.
    #[error("Timed out loading {url}")]
    Timeout { url: String },

    /// Connection-level failure.
    #[error("Network error loading {url}: {message}")]
    Network { url: String, message: String },

    /// Server-side failure (5xx).
    #[error("Server returned {status} for {url}")]
    Status { url: String, status: u16 },

    /// The site refused the request (4xx, bot protection).
    #[error("Request to {url} was blocked ({status})")]
    Blocked { url: String, status: u16 },

    /// A selector never appeared on the loaded page.
    #[error("Selector '{selector}' did not appear within {timeout_ms}ms")]
    SelectorTimeout { selector: String, timeout_ms: u64 },
}

impl FetchError {
    /// Whether retrying the same load may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Blocked { .. })
    }
}

/// Failure raised by the document renderer.
#[derive(Debug, Error)]
#[error("Rendering '{title}' failed: {message}")]
pub struct RenderError {
    pub title: String,
    pub message: String,
}

impl RenderError {
    pub fn new(title: impl Into<String>, message: impl fmt::Display) -> Self {
        Self {
            title: title.into(),
            message: message.to_string(),
        }
    }
}

/// Recorded error partition for a municipality outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Classification,
    Extraction,
    Render,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classification => "classification",
            Self::Extraction => "extraction",
            Self::Render => "render",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result type alias for harvester operations.
pub type Result<T> = std::result::Result<T, HarvesterError>;
