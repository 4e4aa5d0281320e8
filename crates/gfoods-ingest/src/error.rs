//! Error types for synonym ingestion
//!
//! Two layers, matching how failures are handled:
//!
//! - [`IngestError`] is fatal. It covers configuration and file access and
//!   aborts the run before (or instead of) writing the dataset.
//! - [`LookupFailure`] is per name. It is logged, the row gets an empty
//!   value, and the run carries on.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for ingest operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Fatal errors that stop a run
#[derive(Error, Debug)]
pub enum IngestError {
    /// Input dataset does not exist
    #[error("Input CSV not found: '{0}'. Pass --input with the path to the dataset.")]
    InputNotFound(PathBuf),

    /// Dataset header lacks a column the job needs
    #[error("Missing required column '{column}' in '{path}'. The header must contain: {expected}.")]
    MissingColumn {
        column: String,
        path: PathBuf,
        expected: String,
    },

    /// Invalid option or malformed dataset layout
    #[error("Configuration error: {0}")]
    Config(String),

    /// Dataset could not be read or parsed
    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Output could not be written
    #[error("Failed to write '{path}': {source}. Check the directory exists and is writable.")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// HTTP client could not be constructed
    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl IngestError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// True for errors raised before any request is sent
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InputNotFound(_) | Self::MissingColumn { .. } | Self::Config(_)
        )
    }
}

/// Why a single name produced no synonyms
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupFailure {
    /// The service answered but knows no such taxon
    #[error("no match")]
    NotFound,

    /// HTTP 429
    #[error("rate limited by the service (HTTP 429); rerun with a larger --throttle-ms")]
    RateLimited,

    /// Any other non-success status
    #[error("HTTP status {status}")]
    Http { status: u16 },

    /// Connection, timeout or other transport problem
    #[error("request failed: {0}")]
    Transport(String),

    /// Body could not be decoded
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl LookupFailure {
    /// Failures worth a single immediate retry
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Http { status } => *status >= 500,
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

impl From<reqwest::Error> for LookupFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Malformed(err.to_string());
        }
        match err.status() {
            Some(status) if status.as_u16() == 429 => Self::RateLimited,
            Some(status) => Self::Http {
                status: status.as_u16(),
            },
            None => Self::Transport(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for LookupFailure {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

impl From<quick_xml::DeError> for LookupFailure {
    fn from(err: quick_xml::DeError) -> Self {
        Self::Malformed(err.to_string())
    }
}
