//! Open Tree of Life name resolution
//!
//! Names go to the TNRS `match_names` endpoint in batches with synonyms
//! included. Each name's best match contributes its `taxon.synonyms`. A
//! batch that fails with a connection error, timeout or 5xx is retried once.

pub mod models;

use crate::config::RunConfig;
use crate::error::LookupFailure;
use crate::source::{fail_all, Lookup, LookupRequest, SynonymSource};
use crate::throttle::Throttle;
use async_trait::async_trait;
use gfoods_common::synonyms::SynonymSet;
use gfoods_common::types::SourceKind;
use models::{select_best_match, MatchNamesRequest, MatchNamesResponse, NameResult};
use reqwest::Client;
use std::collections::HashMap;
use tracing::{debug, warn};

const MATCH_NAMES_PATH: &str = "/v3/tnrs/match_names";

pub struct OpenTreeClient {
    client: Client,
    url: String,
    throttle: Throttle,
}

impl OpenTreeClient {
    pub fn new(client: Client, config: &RunConfig) -> Self {
        Self {
            client,
            url: format!("{}{}", config.base_url(), MATCH_NAMES_PATH),
            throttle: Throttle::new(config.throttle),
        }
    }

    async fn match_names(&self, names: &[String]) -> Result<MatchNamesResponse, LookupFailure> {
        debug!(url = %self.url, names = names.len(), "POST match_names");

        let request = MatchNamesRequest {
            names,
            include_synonyms: true,
        };
        self.throttle
            .run(async {
                let response = self
                    .client
                    .post(&self.url)
                    .json(&request)
                    .send()
                    .await?
                    .error_for_status()?;
                Ok::<MatchNamesResponse, LookupFailure>(response.json().await?)
            })
            .await
    }

    async fn match_names_with_retry(
        &self,
        names: &[String],
    ) -> Result<MatchNamesResponse, LookupFailure> {
        match self.match_names(names).await {
            Err(e) if e.is_transient() => {
                warn!("match_names failed ({}), retrying once", e);
                self.match_names(names).await
            },
            other => other,
        }
    }
}

/// Synonyms for one name from its TNRS result
fn synonyms_from_result(result: Option<&NameResult>) -> Lookup {
    let result = result.ok_or(LookupFailure::NotFound)?;
    let best = select_best_match(&result.matches).ok_or(LookupFailure::NotFound)?;
    Ok(best
        .taxon
        .synonyms
        .iter()
        .flatten()
        .collect::<SynonymSet>())
}

#[async_trait]
impl SynonymSource for OpenTreeClient {
    fn kind(&self) -> SourceKind {
        SourceKind::OpenTree
    }

    async fn resolve(&self, batch: &[LookupRequest]) -> Vec<(String, Lookup)> {
        if batch.is_empty() {
            return Vec::new();
        }
        let names: Vec<String> = batch.iter().map(|r| r.name.clone()).collect();

        let response = match self.match_names_with_retry(&names).await {
            Ok(response) => response,
            Err(e) => {
                warn!(
                    "Failed to fetch synonyms for batch starting with '{}': {}",
                    names[0], e
                );
                return fail_all(batch, &e);
            },
        };

        let by_name: HashMap<&str, &NameResult> = response
            .results
            .iter()
            .filter_map(|r| r.name.as_deref().map(|n| (n, r)))
            .collect();

        names
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let result = by_name
                    .get(name.as_str())
                    .copied()
                    .or_else(|| response.results.get(idx));
                (name.clone(), synonyms_from_result(result))
            })
            .collect()
    }
}
