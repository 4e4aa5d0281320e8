//! Wikidata `w/api.php` wire models
//!
//! Only the parts of an entity the synonym lookup reads are modelled. The
//! MediaWiki API serialises empty objects as `[]`, so every map goes
//! through [`lenient_map`].

use serde::de::{Deserializer, IgnoredAny};
use serde::Deserialize;
use std::collections::HashMap;
use std::hash::Hash;

/// Property id of "taxon synonym"
pub const TAXON_SYNONYM_PROPERTY: &str = "P1420";

const ENGLISH: &str = "en";
const ENWIKI: &str = "enwiki";

/// Accept `{...}`, `[]` or `null` where a JSON object is expected
pub fn lenient_map<'de, D, K, V>(deserializer: D) -> Result<HashMap<K, V>, D::Error>
where
    D: Deserializer<'de>,
    K: Deserialize<'de> + Eq + Hash,
    V: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MapOrEmpty<K: Eq + Hash, V> {
        Map(HashMap<K, V>),
        Seq(Vec<IgnoredAny>),
        Null(()),
    }

    Ok(match MapOrEmpty::deserialize(deserializer)? {
        MapOrEmpty::Map(map) => map,
        MapOrEmpty::Seq(_) | MapOrEmpty::Null(_) => HashMap::new(),
    })
}

/// API-level error returned with HTTP 200
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub info: String,
}

/// Response of `action=wbgetentities`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntitiesResponse {
    #[serde(default, deserialize_with = "lenient_map")]
    pub entities: HashMap<String, Entity>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

impl EntitiesResponse {
    /// Found entities keyed by their enwiki title with spaces as underscores
    pub fn by_enwiki_title(self) -> HashMap<String, Entity> {
        self.entities
            .into_values()
            .filter(|e| !e.is_missing())
            .filter_map(|e| {
                let title = e.enwiki_title()?.replace(' ', "_");
                Some((title, e))
            })
            .collect()
    }

    /// The first found entity that has an enwiki sitelink
    pub fn into_first_with_sitelink(self) -> Option<Entity> {
        self.entities
            .into_values()
            .find(|e| !e.is_missing() && e.enwiki_title().is_some())
    }

    /// Found entities keyed by id
    pub fn into_found(self) -> HashMap<String, Entity> {
        self.entities
            .into_iter()
            .filter(|(_, e)| !e.is_missing())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub id: Option<String>,
    /// Present (as "") when the requested title or id does not exist
    #[serde(default)]
    pub missing: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_map")]
    pub labels: HashMap<String, LangValue>,
    #[serde(default, deserialize_with = "lenient_map")]
    pub aliases: HashMap<String, Vec<LangValue>>,
    #[serde(default, deserialize_with = "lenient_map")]
    pub claims: HashMap<String, Vec<Claim>>,
    #[serde(default, deserialize_with = "lenient_map")]
    pub sitelinks: HashMap<String, Sitelink>,
}

impl Entity {
    pub fn is_missing(&self) -> bool {
        self.missing.is_some()
    }

    pub fn enwiki_title(&self) -> Option<&str> {
        self.sitelinks
            .get(ENWIKI)
            .map(|s| s.title.as_str())
            .filter(|t| !t.is_empty())
    }

    pub fn english_label(&self) -> Option<&str> {
        self.labels.get(ENGLISH).map(|l| l.value.as_str())
    }

    pub fn english_aliases(&self) -> impl Iterator<Item = &str> {
        self.aliases
            .get(ENGLISH)
            .into_iter()
            .flatten()
            .map(|a| a.value.trim())
            .filter(|v| !v.is_empty())
    }

    /// Item ids referenced by P1420 claims that carry a value
    pub fn taxon_synonym_ids(&self) -> Vec<&str> {
        self.claims
            .get(TAXON_SYNONYM_PROPERTY)
            .into_iter()
            .flatten()
            .filter_map(Claim::item_id)
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LangValue {
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Sitelink {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Claim {
    pub mainsnak: Snak,
}

impl Claim {
    fn item_id(&self) -> Option<&str> {
        if self.mainsnak.snaktype != "value" {
            return None;
        }
        match &self.mainsnak.datavalue.as_ref()?.value {
            SnakValue::Entity(value) if value.entity_type == "item" => value.id.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Snak {
    #[serde(default)]
    pub snaktype: String,
    #[serde(default)]
    pub datavalue: Option<DataValue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataValue {
    pub value: SnakValue,
}

/// Snak values are entity references for item properties and arbitrary
/// JSON (strings, quantities, times) for everything else
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SnakValue {
    Entity(EntityIdValue),
    Other(IgnoredAny),
}

#[derive(Debug, Clone, Deserialize)]
pub struct EntityIdValue {
    #[serde(rename = "entity-type")]
    pub entity_type: String,
    #[serde(default)]
    pub id: Option<String>,
}

/// Response of `action=wbsearchentities`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub search: Vec<SearchHit>,
    #[serde(default)]
    pub error: Option<ApiError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, rename = "match")]
    pub matched: Option<SearchMatch>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchMatch {
    #[serde(default)]
    pub text: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn garlic() -> serde_json::Value {
        json!({
            "entities": {
                "Q23400": {
                    "id": "Q23400",
                    "aliases": {"en": [{"language": "en", "value": "Allium sativum"}, {"language": "en", "value": "garlic plant"}]},
                    "claims": {
                        "P1420": [
                            {"mainsnak": {"snaktype": "value", "datavalue": {"value": {"entity-type": "item", "numeric-id": 1, "id": "Q100"}, "type": "wikibase-entityid"}}},
                            {"mainsnak": {"snaktype": "somevalue"}}
                        ],
                        "P225": [
                            {"mainsnak": {"snaktype": "value", "datavalue": {"value": "Allium sativum", "type": "string"}}}
                        ]
                    },
                    "sitelinks": {"enwiki": {"site": "enwiki", "title": "Allium sativum"}}
                },
                "-1": {"site": "enwiki", "title": "Nonexistent_taxon", "missing": ""}
            }
        })
    }

    #[test]
    fn test_entity_accessors() {
        let response: EntitiesResponse = serde_json::from_value(garlic()).unwrap();
        let entity = &response.entities["Q23400"];

        assert_eq!(entity.enwiki_title(), Some("Allium sativum"));
        assert_eq!(
            entity.english_aliases().collect::<Vec<_>>(),
            vec!["Allium sativum", "garlic plant"]
        );
        assert_eq!(entity.taxon_synonym_ids(), vec!["Q100"]);
        assert!(response.entities["-1"].is_missing());
    }

    #[test]
    fn test_by_enwiki_title_skips_missing() {
        let response: EntitiesResponse = serde_json::from_value(garlic()).unwrap();
        let by_title = response.by_enwiki_title();
        assert_eq!(by_title.len(), 1);
        assert!(by_title.contains_key("Allium_sativum"));
    }

    #[test]
    fn test_empty_maps_serialised_as_arrays() {
        let entity: Entity = serde_json::from_value(json!({
            "id": "Q1", "labels": [], "aliases": [], "claims": [], "sitelinks": null
        }))
        .unwrap();
        assert!(entity.english_label().is_none());
        assert_eq!(entity.english_aliases().count(), 0);
        assert!(entity.taxon_synonym_ids().is_empty());

        let response: EntitiesResponse = serde_json::from_value(json!({"entities": []})).unwrap();
        assert!(response.entities.is_empty());
    }

    #[test]
    fn test_search_hit_match_field() {
        let response: SearchResponse = serde_json::from_value(json!({
            "search": [{"id": "Q1", "label": "Garlic", "match": {"type": "alias", "text": "garlic"}}]
        }))
        .unwrap();
        assert_eq!(response.search[0].matched.as_ref().unwrap().text.as_deref(), Some("garlic"));
    }
}
