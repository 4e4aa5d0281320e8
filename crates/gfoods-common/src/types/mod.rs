//! Domain types shared between the ingest library and its binary

use crate::error::CommonError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Column holding the original row index is always the first header cell;
/// these are the named columns every dataset must carry.
pub const COMMON_NAME_COLUMN: &str = "food_com";
pub const SCIENTIFIC_NAME_COLUMN: &str = "food_sci";

/// Default input dataset, relative to the working directory
pub const DEFAULT_INPUT_PATH: &str = "ndm_foods.csv";

/// Contact identifier sent to every API when none is configured
pub const DEFAULT_CONTACT: &str = "https://example.com/contact";

/// External service a synonym column is filled from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Open Tree of Life taxonomic name resolution
    OpenTree,
    /// Wikidata entity aliases and taxon-synonym claims
    Wikidata,
    /// NCBI Taxonomy via E-utilities
    Ncbi,
}

impl SourceKind {
    pub const ALL: [SourceKind; 3] = [SourceKind::OpenTree, SourceKind::Wikidata, SourceKind::Ncbi];

    /// CSV column this source owns
    pub fn column(self) -> &'static str {
        match self {
            SourceKind::OpenTree => "synonyms_open_tree_of_life",
            SourceKind::Wikidata => "synonyms_wiki_search",
            SourceKind::Ncbi => "synonyms_ncbi",
        }
    }

    /// Short tag used as the log/progress prefix
    pub fn tag(self) -> &'static str {
        match self {
            SourceKind::OpenTree => "opentree",
            SourceKind::Wikidata => "wikidata",
            SourceKind::Ncbi => "ncbi",
        }
    }

    pub fn defaults(self) -> SourceDefaults {
        match self {
            SourceKind::OpenTree => SourceDefaults {
                base_url: "https://api.opentreeoflife.org",
                batch_size: 40,
                throttle: Duration::from_millis(150),
                timeout: Duration::from_secs(30),
            },
            SourceKind::Wikidata => SourceDefaults {
                base_url: "https://www.wikidata.org/w/api.php",
                batch_size: 40,
                throttle: Duration::from_millis(20),
                timeout: Duration::from_secs(25),
            },
            // E-utilities allow three requests per second without an API key.
            SourceKind::Ncbi => SourceDefaults {
                base_url: "https://eutils.ncbi.nlm.nih.gov/entrez/eutils",
                batch_size: 1,
                throttle: Duration::from_millis(340),
                timeout: Duration::from_secs(30),
            },
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

impl std::str::FromStr for SourceKind {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "opentree" | "open-tree" | "otol" => Ok(SourceKind::OpenTree),
            "wikidata" | "wiki" => Ok(SourceKind::Wikidata),
            "ncbi" => Ok(SourceKind::Ncbi),
            _ => Err(CommonError::UnknownSource(s.to_string())),
        }
    }
}

/// Per-source request tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceDefaults {
    pub base_url: &'static str,
    pub batch_size: usize,
    /// Minimum gap between two outbound requests
    pub throttle: Duration,
    pub timeout: Duration,
}

/// Normalise a name cell from the dataset: underscores become spaces and the
/// result is trimmed.
pub fn format_name(raw: &str) -> String {
    raw.replace('_', " ").trim().to_string()
}

/// User-Agent header sent to every service, embedding the contact identifier
pub fn user_agent(contact: &str) -> String {
    format!("gFoodsScraper/0.1 (+{})", contact)
}
