//! NCBI Taxonomy synonym lookup
//!
//! Two E-utilities calls per name: `esearch` maps the name to a taxonomy id,
//! `efetch` returns the taxon record whose `OtherNames` hold the synonyms.
//! The contact identifier is sent as the `email` parameter on every call.

pub mod models;

use crate::config::RunConfig;
use crate::error::LookupFailure;
use crate::source::{Lookup, LookupRequest, SynonymSource};
use crate::throttle::Throttle;
use async_trait::async_trait;
use gfoods_common::synonyms::SynonymSet;
use gfoods_common::types::SourceKind;
use models::{parse_taxa, ESearchResponse};
use reqwest::Client;
use tracing::debug;

/// `tool` parameter identifying this client to E-utilities
pub const TOOL_NAME: &str = "gFoodsScraper";

pub struct NcbiClient {
    client: Client,
    base_url: String,
    contact: String,
    throttle: Throttle,
}

impl NcbiClient {
    pub fn new(client: Client, config: &RunConfig) -> Self {
        Self {
            client,
            base_url: config.base_url().to_string(),
            contact: config.contact.clone(),
            throttle: Throttle::new(config.throttle),
        }
    }

    async fn eutils_get(
        &self,
        utility: &str,
        params: &[(&str, &str)],
    ) -> Result<String, LookupFailure> {
        let url = format!("{}/{}", self.base_url, utility);
        debug!(%url, ?params, "GET eutils");

        self.throttle
            .run(async {
                let response = self
                    .client
                    .get(&url)
                    .query(&[("db", "taxonomy"), ("tool", TOOL_NAME), ("email", self.contact.as_str())])
                    .query(params)
                    .send()
                    .await?
                    .error_for_status()?;
                Ok::<_, LookupFailure>(response.text().await?)
            })
            .await
    }

    /// Taxonomy id for a name, `NotFound` when the search is empty
    async fn search_id(&self, name: &str) -> Result<String, LookupFailure> {
        let body = self
            .eutils_get(
                "esearch.fcgi",
                &[("term", name), ("retmode", "json"), ("retmax", "1")],
            )
            .await?;
        let response: ESearchResponse = serde_json::from_str(&body)?;

        if let Some(id) = response.first_id() {
            return Ok(id.to_string());
        }
        match response.error_message() {
            Some(msg) if msg.to_lowercase().contains("rate limit") => Err(LookupFailure::RateLimited),
            Some(msg) => Err(LookupFailure::Malformed(format!("esearch error: {}", msg))),
            None => Err(LookupFailure::NotFound),
        }
    }

    async fn fetch_synonyms(&self, id: &str) -> Lookup {
        let body = self
            .eutils_get("efetch.fcgi", &[("id", id), ("retmode", "xml")])
            .await?;

        let taxa = parse_taxa(&body)?;
        let taxon = taxa
            .taxa
            .into_iter()
            .next()
            .ok_or_else(|| LookupFailure::Malformed(format!("efetch returned no taxon for id {}", id)))?;

        Ok(taxon
            .other_names
            .iter()
            .flat_map(|names| names.in_priority_order())
            .collect::<SynonymSet>())
    }

    async fn lookup(&self, name: &str) -> Lookup {
        let id = self.search_id(name).await?;
        debug!(name, id = %id, "Resolved taxonomy id");
        self.fetch_synonyms(&id).await
    }
}

#[async_trait]
impl SynonymSource for NcbiClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Ncbi
    }

    async fn resolve(&self, batch: &[LookupRequest]) -> Vec<(String, Lookup)> {
        let mut outcomes = Vec::with_capacity(batch.len());
        for request in batch {
            outcomes.push((request.name.clone(), self.lookup(&request.name).await));
        }
        outcomes
    }
}
