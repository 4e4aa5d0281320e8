//! Open Tree of Life TNRS wire models

use serde::{Deserialize, Serialize};

/// Body of `POST /v3/tnrs/match_names`
#[derive(Debug, Clone, Serialize)]
pub struct MatchNamesRequest<'a> {
    pub names: &'a [String],
    pub include_synonyms: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchNamesResponse {
    #[serde(default)]
    pub results: Vec<NameResult>,
}

/// Matches for one submitted name
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NameResult {
    /// The submitted name, echoed back
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub matches: Vec<TaxonMatch>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct TaxonMatch {
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub is_synonym: bool,
    #[serde(default)]
    pub is_approximate_match: bool,
    #[serde(default)]
    pub matched_name: Option<String>,
    #[serde(default)]
    pub taxon: Taxon,
}

impl TaxonMatch {
    pub fn score(&self) -> f64 {
        self.score.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Taxon {
    #[serde(default)]
    pub ott_id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub synonyms: Option<Vec<String>>,
}

/// Pick the match whose synonyms represent the name.
///
/// Matches are ranked by score (ties keep response order). The first exact,
/// non-synonym match wins; failing that the first non-synonym; failing that
/// the top-scored match.
pub fn select_best_match(matches: &[TaxonMatch]) -> Option<&TaxonMatch> {
    let mut ranked: Vec<&TaxonMatch> = matches.iter().collect();
    ranked.sort_by(|a, b| b.score().total_cmp(&a.score()));

    ranked
        .iter()
        .find(|m| !m.is_synonym && !m.is_approximate_match)
        .or_else(|| ranked.iter().find(|m| !m.is_synonym))
        .or_else(|| ranked.first())
        .copied()
}
