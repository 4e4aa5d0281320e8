//! One synonym-enrichment job from input CSV to written output
//!
//! The job loads the dataset, walks eligible rows batch by batch, resolves
//! each distinct name at most once, and writes the source's column back in a
//! single atomic write at the end. Per-name failures never abort the job;
//! they are logged, recorded in the [`RunReport`], and leave an empty cell.

use crate::batch::{batch_count, eligible_count, NameBatcher};
use crate::config::RunConfig;
use crate::dataset::Dataset;
use crate::error::{LookupFailure, Result};
use crate::progress::{format_elapsed, BatchProgress};
use crate::source::{Lookup, LookupRequest, SynonymSource};
use gfoods_common::types::SourceKind;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// What happened to one processed row
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// Lookup succeeded with this many synonyms
    Resolved(usize),
    /// Lookup succeeded but the taxon has no synonyms
    Empty,
    NotFound,
    Failed(LookupFailure),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowOutcome {
    /// Zero-based row position
    pub row: usize,
    /// Value of the dataset's index column
    pub index: String,
    pub name: String,
    pub status: OutcomeStatus,
}

/// Aggregate result of a job
#[derive(Debug, Clone)]
pub struct RunReport {
    pub source: SourceKind,
    pub output: PathBuf,
    pub total_rows: usize,
    /// Rows skipped for lacking a scientific name
    pub skipped: usize,
    /// Distinct names sent to the service
    pub names_looked_up: usize,
    pub outcomes: Vec<RowOutcome>,
    pub elapsed: Duration,
}

impl RunReport {
    pub fn processed(&self) -> usize {
        self.outcomes.len()
    }

    pub fn resolved(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Resolved(_)))
    }

    /// Rows with no synonyms: no match, or a match without synonyms
    pub fn not_found(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::NotFound | OutcomeStatus::Empty))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, OutcomeStatus::Failed(_)))
    }

    fn count(&self, pred: impl Fn(&OutcomeStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }

    pub fn log_summary(&self) {
        info!(
            source = %self.source,
            processed = self.processed(),
            resolved = self.resolved(),
            not_found = self.not_found(),
            failed = self.failed(),
            skipped = self.skipped,
            elapsed = %format_elapsed(self.elapsed),
            output = %self.output.display(),
            "Synonym lookup finished"
        );
    }
}

/// Run `source` over the dataset described by `config`
pub async fn run(source: &dyn SynonymSource, config: &RunConfig) -> Result<RunReport> {
    config.validate()?;
    let started = Instant::now();
    let kind = source.kind();

    let mut dataset = Dataset::load(&config.input)?;
    let column = dataset.ensure_column(kind.column());

    let planned = eligible_count(&dataset, config.limit);
    let ineligible = dataset.rows().filter(|r| !r.is_eligible()).count();
    let mut progress = BatchProgress::new(kind, batch_count(planned, config.batch_size), planned);

    let mut cache: HashMap<String, Lookup> = HashMap::new();
    let mut outcomes = Vec::with_capacity(planned);
    let mut updates: Vec<(usize, String)> = Vec::with_capacity(planned);

    for batch in NameBatcher::new(&dataset, config.batch_size, config.limit) {
        let mut queued = HashSet::new();
        let requests: Vec<LookupRequest> = batch
            .entries
            .iter()
            .filter(|e| !cache.contains_key(&e.name) && queued.insert(e.name.as_str()))
            .map(|e| LookupRequest {
                name: e.name.clone(),
                common_name: e.common_name.clone(),
            })
            .collect();

        if !requests.is_empty() {
            for (name, lookup) in source.resolve(&requests).await {
                cache.insert(name, lookup);
            }
        }

        for entry in &batch.entries {
            let lookup = cache.get(&entry.name).cloned().unwrap_or_else(|| {
                Err(LookupFailure::Malformed("no outcome returned for name".to_string()))
            });
            let index = dataset.cell(entry.row, 0).to_string();
            let status = status_of(&lookup);
            log_outcome(kind, &index, &entry.name, &status);

            updates.push((entry.row, cell_value(&lookup, config.no_match_marker.as_deref())));
            outcomes.push(RowOutcome {
                row: entry.row,
                index,
                name: entry.name.clone(),
                status,
            });
        }

        progress.batch_done(batch.index, batch.len());
    }

    for (row, value) in updates {
        dataset.set_cell(row, column, value);
    }
    let output = config.output_path().to_path_buf();
    dataset.save(&output)?;

    let report = RunReport {
        source: kind,
        output,
        total_rows: dataset.len(),
        skipped: ineligible,
        names_looked_up: cache.len(),
        outcomes,
        elapsed: started.elapsed(),
    };
    report.log_summary();
    Ok(report)
}

fn status_of(lookup: &Lookup) -> OutcomeStatus {
    match lookup {
        Ok(set) if set.is_empty() => OutcomeStatus::Empty,
        Ok(set) => OutcomeStatus::Resolved(set.len()),
        Err(LookupFailure::NotFound) => OutcomeStatus::NotFound,
        Err(e) => OutcomeStatus::Failed(e.clone()),
    }
}

/// Cell text for a lookup. Failures are always empty; the marker only
/// replaces "" for names the service answered without synonyms.
pub fn cell_value(lookup: &Lookup, no_match_marker: Option<&str>) -> String {
    match lookup {
        Ok(set) if !set.is_empty() => set.to_cell(),
        Ok(_) | Err(LookupFailure::NotFound) => no_match_marker.unwrap_or_default().to_string(),
        Err(_) => String::new(),
    }
}

fn log_outcome(kind: SourceKind, index: &str, name: &str, status: &OutcomeStatus) {
    match status {
        OutcomeStatus::Resolved(_) => {},
        OutcomeStatus::Empty | OutcomeStatus::NotFound => {
            warn!("[{}] row {} ('{}'): no synonyms found", kind, index, name);
        },
        OutcomeStatus::Failed(e) => {
            warn!("[{}] row {} ('{}'): lookup failed: {}", kind, index, name, e);
        },
    }
}
