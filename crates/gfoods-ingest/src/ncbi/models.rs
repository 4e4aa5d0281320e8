//! NCBI E-utilities response models
//!
//! `esearch` is requested as JSON; `efetch` for the taxonomy database only
//! speaks XML, which is decoded with quick-xml's serde support.

use serde::Deserialize;

/// `esearch.fcgi?retmode=json` body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ESearchResponse {
    #[serde(default)]
    pub esearchresult: Option<ESearchResult>,
    /// Top-level error such as "API rate limit exceeded"
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ESearchResult {
    #[serde(default)]
    pub idlist: Vec<String>,
    #[serde(default, rename = "ERROR")]
    pub error: Option<String>,
}

impl ESearchResponse {
    /// First taxonomy id, if the term matched anything
    pub fn first_id(&self) -> Option<&str> {
        self.esearchresult
            .as_ref()?
            .idlist
            .first()
            .map(String::as_str)
            .filter(|id| !id.trim().is_empty())
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or_else(|| self.esearchresult.as_ref()?.error.as_deref())
    }
}

/// `efetch.fcgi?db=taxonomy&retmode=xml` root element
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaxaSet {
    #[serde(rename = "Taxon", default)]
    pub taxa: Vec<TaxonRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaxonRecord {
    #[serde(rename = "TaxId", default)]
    pub tax_id: Option<String>,
    #[serde(rename = "ScientificName", default)]
    pub scientific_name: Option<String>,
    #[serde(rename = "OtherNames", default)]
    pub other_names: Option<OtherNames>,
}

/// Alternate names; element kinds are interleaved in the XML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OtherNames {
    #[serde(rename = "Synonym", default)]
    pub synonyms: Vec<String>,
    #[serde(rename = "EquivalentName", default)]
    pub equivalent_names: Vec<String>,
    #[serde(rename = "GenbankCommonName", default)]
    pub genbank_common_names: Vec<String>,
    #[serde(rename = "CommonName", default)]
    pub common_names: Vec<String>,
}

impl OtherNames {
    /// Synonyms, then equivalent names, then GenBank and other common names
    pub fn in_priority_order(&self) -> impl Iterator<Item = &str> {
        self.synonyms
            .iter()
            .chain(&self.equivalent_names)
            .chain(&self.genbank_common_names)
            .chain(&self.common_names)
            .map(String::as_str)
    }
}

/// Parse an efetch taxonomy document
pub fn parse_taxa(xml: &str) -> Result<TaxaSet, quick_xml::DeError> {
    quick_xml::de::from_str(xml)
}
