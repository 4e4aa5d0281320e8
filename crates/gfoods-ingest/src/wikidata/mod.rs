//! Wikidata synonym lookup
//!
//! Resolution runs in three passes per batch:
//!
//! 1. `wbgetentities` by English Wikipedia title for the whole batch
//! 2. the same, one title at a time with `normalize=true`, for titles the
//!    bulk call did not match
//! 3. `wbsearchentities` over candidate queries derived from the scientific
//!    and common names, followed by `wbgetentities` on the chosen ids
//!
//! Synonyms are the entity's English aliases plus the English labels of
//! items it references through P1420 (taxon synonym).

pub mod models;

use crate::config::RunConfig;
use crate::error::LookupFailure;
use crate::source::{Lookup, LookupRequest, SynonymSource};
use crate::throttle::Throttle;
use async_trait::async_trait;
use gfoods_common::synonyms::{without_case_insensitive_dupes, SynonymSet};
use gfoods_common::types::SourceKind;
use models::{EntitiesResponse, Entity, SearchHit, SearchResponse};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Titles or ids per `wbgetentities` call (the API caps this at 50)
const ENTITY_CHUNK_SIZE: usize = 40;
const SEARCH_LIMIT: &str = "5";

pub struct WikidataClient {
    client: Client,
    url: String,
    throttle: Throttle,
    /// Search query -> chosen entity id, shared across batches
    search_cache: Mutex<HashMap<String, Option<String>>>,
}

/// Per-name resolution state within one batch
#[derive(Default)]
struct Slot {
    entity: Option<Entity>,
    failure: Option<LookupFailure>,
}

impl WikidataClient {
    pub fn new(client: Client, config: &RunConfig) -> Self {
        Self {
            client,
            url: config.base_url().to_string(),
            throttle: Throttle::new(config.throttle),
            search_cache: Mutex::new(HashMap::new()),
        }
    }

    async fn api_get<T: DeserializeOwned>(
        &self,
        action: &str,
        params: &[(&str, &str)],
    ) -> Result<T, LookupFailure> {
        debug!(action, ?params, "GET wikidata");

        self.throttle
            .run(async {
                let response = self
                    .client
                    .get(&self.url)
                    .query(&[("action", action), ("format", "json")])
                    .query(params)
                    .send()
                    .await?
                    .error_for_status()?;
                Ok::<T, LookupFailure>(response.json().await?)
            })
            .await
    }

    async fn get_entities(&self, params: &[(&str, &str)]) -> Result<EntitiesResponse, LookupFailure> {
        let response: EntitiesResponse = self.api_get("wbgetentities", params).await?;
        match response.error {
            Some(err) => Err(LookupFailure::Malformed(format!(
                "wbgetentities error {}: {}",
                err.code, err.info
            ))),
            None => Ok(response),
        }
    }

    async fn entities_by_titles(&self, titles: &str) -> Result<EntitiesResponse, LookupFailure> {
        self.get_entities(&[
            ("sites", "enwiki"),
            ("titles", titles),
            ("props", "aliases|claims|sitelinks"),
            ("languages", "en"),
        ])
        .await
    }

    async fn entity_by_normalized_title(&self, title: &str) -> Result<Option<Entity>, LookupFailure> {
        let response = self
            .get_entities(&[
                ("sites", "enwiki"),
                ("titles", title),
                ("props", "aliases|claims|sitelinks"),
                ("languages", "en"),
                ("normalize", "true"),
            ])
            .await?;
        Ok(response.into_first_with_sitelink())
    }

    /// Fetch entities by id in chunks; failed chunks are logged and the
    /// last failure is returned alongside whatever was fetched
    async fn entities_by_ids(&self, ids: &[String]) -> (HashMap<String, Entity>, Option<LookupFailure>) {
        let mut found = HashMap::new();
        let mut failure = None;

        for chunk in ids.chunks(ENTITY_CHUNK_SIZE) {
            let joined = chunk.join("|");
            let result = self
                .get_entities(&[
                    ("ids", joined.as_str()),
                    ("props", "labels|aliases|claims"),
                    ("languages", "en"),
                ])
                .await;
            match result {
                Ok(response) => found.extend(response.into_found()),
                Err(e) => {
                    warn!("Failed fetching entities starting with {}: {}", chunk[0], e);
                    failure = Some(e);
                },
            }
        }
        (found, failure)
    }

    async fn search_entity_id(&self, query: &str) -> Result<Option<String>, LookupFailure> {
        if let Some(cached) = self.search_cache.lock().await.get(query) {
            return Ok(cached.clone());
        }

        let response: SearchResponse = self
            .api_get(
                "wbsearchentities",
                &[("language", "en"), ("search", query), ("limit", SEARCH_LIMIT)],
            )
            .await?;
        if let Some(err) = response.error {
            return Err(LookupFailure::Malformed(format!(
                "wbsearchentities error {}: {}",
                err.code, err.info
            )));
        }

        let id = select_search_hit(query, &response.search).map(|hit| hit.id.clone());
        self.search_cache
            .lock()
            .await
            .insert(query.to_string(), id.clone());
        Ok(id)
    }

    /// Pass 1 and 2: match by enwiki title
    async fn resolve_titles(&self, titles: &[String], slots: &mut [Slot]) {
        let mut offset = 0;
        for chunk in titles.chunks(ENTITY_CHUNK_SIZE) {
            match self.entities_by_titles(&chunk.join("|")).await {
                Ok(response) => {
                    let mut by_title = response.by_enwiki_title();
                    for (i, title) in chunk.iter().enumerate() {
                        slots[offset + i].entity = by_title.remove(title);
                    }
                },
                Err(e) => {
                    warn!("Failed fetching titles batch starting with {}: {}", chunk[0], e);
                    for slot in &mut slots[offset..offset + chunk.len()] {
                        slot.failure = Some(e.clone());
                    }
                },
            }
            offset += chunk.len();
        }

        let leftovers: Vec<usize> = (0..titles.len())
            .filter(|&i| slots[i].entity.is_none() && slots[i].failure.is_none())
            .collect();
        for (n, &i) in leftovers.iter().enumerate() {
            debug!("Resolving leftover title {}/{}: {}", n + 1, leftovers.len(), titles[i]);
            match self.entity_by_normalized_title(&titles[i]).await {
                Ok(entity) => slots[i].entity = entity,
                Err(e) => {
                    warn!("Failed to resolve title {}: {}", titles[i], e);
                    slots[i].failure = Some(e);
                },
            }
        }
    }

    /// Pass 3: search candidate queries for names still unmatched
    async fn resolve_by_search(&self, batch: &[LookupRequest], slots: &mut [Slot]) {
        let unmatched: Vec<usize> = (0..batch.len()).filter(|&i| slots[i].entity.is_none()).collect();
        if unmatched.is_empty() {
            return;
        }
        info!("Falling back to search for {} names", unmatched.len());

        let mut chosen: Vec<(usize, String)> = Vec::new();
        for i in unmatched {
            let request = &batch[i];
            for query in candidate_queries(&request.name, request.common_name.as_deref()) {
                match self.search_entity_id(&query).await {
                    Ok(Some(id)) => {
                        chosen.push((i, id));
                        break;
                    },
                    Ok(None) => {},
                    Err(e) => {
                        warn!("Wikidata search failed for '{}': {}", query, e);
                        slots[i].failure.get_or_insert(e);
                    },
                }
            }
        }

        let mut ids: Vec<String> = chosen.iter().map(|(_, id)| id.clone()).collect();
        dedupe_in_place(&mut ids);
        let (fetched, failure) = self.entities_by_ids(&ids).await;

        for (i, id) in chosen {
            match fetched.get(&id) {
                Some(entity) => slots[i].entity = Some(entity.clone()),
                None => {
                    if let Some(e) = &failure {
                        slots[i].failure = Some(e.clone());
                    }
                },
            }
        }
    }

    /// English labels of every P1420 target referenced by the matched entities
    async fn synonym_labels(&self, slots: &[Slot]) -> HashMap<String, String> {
        let mut ids: Vec<String> = slots
            .iter()
            .filter_map(|s| s.entity.as_ref())
            .flat_map(|e| e.taxon_synonym_ids())
            .map(str::to_string)
            .collect();
        dedupe_in_place(&mut ids);
        if ids.is_empty() {
            return HashMap::new();
        }

        debug!("Fetching {} synonym-linked entities", ids.len());
        let (fetched, _) = self.entities_by_ids(&ids).await;
        fetched
            .into_iter()
            .filter_map(|(id, e)| e.english_label().map(|l| (id, l.to_string())))
            .collect()
    }
}

#[async_trait]
impl SynonymSource for WikidataClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Wikidata
    }

    async fn resolve(&self, batch: &[LookupRequest]) -> Vec<(String, Lookup)> {
        let titles: Vec<String> = batch.iter().map(|r| wiki_title(&r.name)).collect();
        let mut slots: Vec<Slot> = batch.iter().map(|_| Slot::default()).collect();

        self.resolve_titles(&titles, &mut slots).await;
        self.resolve_by_search(batch, &mut slots).await;
        let labels = self.synonym_labels(&slots).await;

        let leftover: Vec<&str> = titles
            .iter()
            .zip(&slots)
            .filter(|(_, s)| s.entity.is_none())
            .map(|(t, _)| t.as_str())
            .collect();
        if !leftover.is_empty() {
            info!(titles = ?leftover, "No Wikidata entity found for {} titles", leftover.len());
        }

        batch
            .iter()
            .zip(slots)
            .map(|(request, slot)| {
                let outcome = match (slot.entity, slot.failure) {
                    (Some(entity), _) => Ok(collect_synonyms(&entity, &labels, &request.name)),
                    (None, Some(failure)) => Err(failure),
                    (None, None) => Err(LookupFailure::NotFound),
                };
                (request.name.clone(), outcome)
            })
            .collect()
    }
}

/// Wikipedia title form of a name
fn wiki_title(name: &str) -> String {
    name.replace(' ', "_")
}

/// Queries tried in order when title lookup fails: the name, the name
/// without a trailing period, the genus alone for `sp.`/`spp.` names, and
/// the common name
pub fn candidate_queries(scientific: &str, common: Option<&str>) -> Vec<String> {
    let mut candidates = Vec::new();

    if !scientific.is_empty() {
        candidates.push(scientific.to_string());
        if let Some(stripped) = scientific.strip_suffix('.') {
            candidates.push(stripped.to_string());
        }
        let lower = scientific.to_lowercase();
        if [" sp.", " sp", " spp.", " spp"].iter().any(|s| lower.ends_with(s)) {
            if let Some((genus, _)) = scientific.rsplit_once(' ') {
                candidates.push(genus.to_string());
            }
        }
    }
    if let Some(common) = common.filter(|c| !c.is_empty()) {
        candidates.push(common.to_string());
    }

    candidates.retain(|c| !c.is_empty());
    dedupe_in_place(&mut candidates);
    candidates
}

/// Exact label match, then exact `match.text`, then the top hit
/// (all comparisons case-insensitive)
pub fn select_search_hit<'a>(query: &str, hits: &'a [SearchHit]) -> Option<&'a SearchHit> {
    let query = query.to_lowercase();
    let eq = |value: Option<&str>| value.is_some_and(|v| v.to_lowercase() == query);

    hits.iter()
        .find(|h| eq(h.label.as_deref()))
        .or_else(|| {
            hits.iter()
                .find(|h| eq(h.matched.as_ref().and_then(|m| m.text.as_deref())))
        })
        .or_else(|| hits.first())
}

/// Aliases plus P1420 labels, without the queried name or case-insensitive repeats
fn collect_synonyms(entity: &Entity, labels: &HashMap<String, String>, name: &str) -> SynonymSet {
    let linked = entity
        .taxon_synonym_ids()
        .into_iter()
        .filter_map(|id| labels.get(id).map(String::as_str));
    let combined = entity.english_aliases().chain(linked);

    without_case_insensitive_dupes(combined, name)
        .into_iter()
        .collect()
}

fn dedupe_in_place(values: &mut Vec<String>) {
    let mut seen = HashSet::new();
    values.retain(|v| seen.insert(v.clone()));
}
