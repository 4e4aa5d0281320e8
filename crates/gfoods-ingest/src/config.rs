//! Per-run configuration
//!
//! A [`RunConfig`] starts from the source's [`SourceDefaults`] and is then
//! adjusted by command-line flags. Nothing here is global: the contact
//! identifier and throttle interval travel with the config into each client.

use crate::error::{IngestError, Result};
use gfoods_common::types::{SourceKind, DEFAULT_CONTACT};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Everything one job invocation needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub source: SourceKind,

    /// Dataset to read
    pub input: PathBuf,

    /// Where to write; `None` overwrites the input
    pub output: Option<PathBuf>,

    /// Cap on eligible rows processed
    pub limit: Option<usize>,

    /// Contact identifier embedded in requests (User-Agent, NCBI `email`)
    pub contact: String,

    pub batch_size: usize,

    /// Minimum gap between outbound requests
    pub throttle: Duration,

    pub timeout: Duration,

    pub base_url: String,

    /// Written instead of "" when a lookup succeeded but found nothing
    pub no_match_marker: Option<String>,
}

impl RunConfig {
    /// Config with the source's defaults reading from `input`
    pub fn new(source: SourceKind, input: impl Into<PathBuf>) -> Self {
        let defaults = source.defaults();
        Self {
            source,
            input: input.into(),
            output: None,
            limit: None,
            contact: DEFAULT_CONTACT.to_string(),
            batch_size: defaults.batch_size,
            throttle: defaults.throttle,
            timeout: defaults.timeout,
            base_url: defaults.base_url.to_string(),
            no_match_marker: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_contact(mut self, contact: impl Into<String>) -> Self {
        self.contact = contact.into();
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_no_match_marker(mut self, marker: impl Into<String>) -> Self {
        self.no_match_marker = Some(marker.into());
        self
    }

    /// Destination of the final write
    pub fn output_path(&self) -> &Path {
        self.output.as_deref().unwrap_or(&self.input)
    }

    /// True when the run will overwrite its own input
    pub fn in_place(&self) -> bool {
        self.output_path() == self.input.as_path()
    }

    /// Base URL without a trailing slash, ready for path joins
    pub fn base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Reject settings that cannot work before any file or network access
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(IngestError::config("batch size must be at least 1"));
        }
        if self.source == SourceKind::Ncbi && self.batch_size != 1 {
            return Err(IngestError::config(
                "the ncbi source looks names up one at a time; --batch-size must be 1",
            ));
        }
        if self.contact.trim().is_empty() {
            return Err(IngestError::config(
                "a contact identifier is required (set --contact or GFOODS_CONTACT)",
            ));
        }
        if self.timeout.is_zero() {
            return Err(IngestError::config("request timeout must be greater than zero"));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(IngestError::config(format!(
                "base URL must start with http:// or https://, got '{}'",
                self.base_url
            )));
        }
        if let Some(marker) = &self.no_match_marker {
            if marker.contains(gfoods_common::synonyms::SYNONYM_SEPARATOR) {
                return Err(IngestError::config(
                    "--no-match-marker cannot contain ';' because it would read as a synonym list",
                ));
            }
        }
        Ok(())
    }
}
