//! The contract every synonym source implements
//!
//! A source turns a batch of names into one outcome per distinct name. It
//! never fails as a whole: transport errors, bad statuses and missing taxa
//! all come back as a per-name [`LookupFailure`] so the pipeline can log
//! them and move on.

use crate::config::RunConfig;
use crate::error::{LookupFailure, Result};
use crate::{ncbi, opentree, wikidata};
use async_trait::async_trait;
use gfoods_common::synonyms::SynonymSet;
use gfoods_common::types::{user_agent, SourceKind};
use reqwest::Client;

/// Outcome of resolving one name
pub type Lookup = std::result::Result<SynonymSet, LookupFailure>;

/// One name to resolve, with the row's common name for search fallbacks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupRequest {
    pub name: String,
    pub common_name: Option<String>,
}

impl LookupRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            common_name: None,
        }
    }

    pub fn with_common_name(mut self, common_name: impl Into<String>) -> Self {
        self.common_name = Some(common_name.into());
        self
    }
}

#[async_trait]
pub trait SynonymSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Resolve a batch of distinct names.
    ///
    /// Returns one `(name, outcome)` pair per request, in request order.
    async fn resolve(&self, batch: &[LookupRequest]) -> Vec<(String, Lookup)>;
}

/// HTTP client carrying the contact User-Agent and the configured timeout
pub fn http_client(config: &RunConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(user_agent(&config.contact))
        .timeout(config.timeout)
        .build()?;
    Ok(client)
}

/// Same failure recorded against every name of a batch
pub(crate) fn fail_all(batch: &[LookupRequest], failure: &LookupFailure) -> Vec<(String, Lookup)> {
    batch
        .iter()
        .map(|req| (req.name.clone(), Err(failure.clone())))
        .collect()
}

/// Client for the configured source
pub fn build_source(config: &RunConfig) -> Result<Box<dyn SynonymSource>> {
    config.validate()?;
    let client = http_client(config)?;

    let source: Box<dyn SynonymSource> = match config.source {
        SourceKind::OpenTree => Box::new(opentree::OpenTreeClient::new(client, config)),
        SourceKind::Wikidata => Box::new(wikidata::WikidataClient::new(client, config)),
        SourceKind::Ncbi => Box::new(ncbi::NcbiClient::new(client, config)),
    };
    Ok(source)
}
