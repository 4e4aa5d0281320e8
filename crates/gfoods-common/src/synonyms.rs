//! Synonym sets and their canonical CSV representation
//!
//! A [`SynonymSet`] is the collection of alternate names one source returned
//! for one taxon. Entries are trimmed, empty entries are dropped, and exact
//! (case-sensitive) duplicates collapse onto the first occurrence, so the
//! serialised form is stable across reruns.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Separator between synonyms inside one CSV cell
pub const SYNONYM_SEPARATOR: char = ';';

/// Ordered, deduplicated synonyms for one name from one source
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynonymSet {
    entries: Vec<String>,
}

impl SynonymSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one synonym; returns false when it was blank or already present
    pub fn insert(&mut self, value: impl AsRef<str>) -> bool {
        let value = value.as_ref().trim();
        if value.is_empty() || self.contains(value) {
            return false;
        }
        self.entries.push(value.to_string());
        true
    }

    pub fn contains(&self, value: &str) -> bool {
        self.entries.iter().any(|e| e == value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Canonical cell value: entries joined with `;`, empty set -> ""
    pub fn to_cell(&self) -> String {
        let mut out = String::new();
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                out.push(SYNONYM_SEPARATOR);
            }
            out.push_str(entry);
        }
        out
    }
}

impl<S: AsRef<str>> FromIterator<S> for SynonymSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = SynonymSet::new();
        set.extend(iter);
        set
    }
}

impl<S: AsRef<str>> Extend<S> for SynonymSet {
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl std::fmt::Display for SynonymSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_cell())
    }
}

/// Normalise a raw alias list straight to its cell value
pub fn normalize<I, S>(raw: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter().collect::<SynonymSet>().to_cell()
}

/// Drop entries equal to `canonical` and collapse duplicates that differ
/// only by case, keeping the first spelling seen.
pub fn without_case_insensitive_dupes<'a, I>(values: I, canonical: &str) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen: HashSet<String> = HashSet::new();
    seen.insert(canonical.trim().to_lowercase());

    values
        .into_iter()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .filter(|v| seen.insert(v.to_lowercase()))
        .map(str::to_string)
        .collect()
}
