//! gFoods Ingest Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Fills the synonym columns of the gFoods food-taxonomy CSV from external
//! taxonomy services. Each source is an independent job that owns one
//! column:
//!
//! - **Open Tree of Life** (`opentree`): TNRS name matching, batched
//! - **Wikidata** (`wikidata`): entity aliases and taxon-synonym claims
//! - **NCBI Taxonomy** (`ncbi`): E-utilities `OtherNames`, one name at a time
//!
//! # Example
//!
//! ```no_run
//! use gfoods_common::types::SourceKind;
//! use gfoods_ingest::config::RunConfig;
//!
//! # async fn demo() -> gfoods_ingest::Result<()> {
//! let config = RunConfig::new(SourceKind::OpenTree, "ndm_foods.csv")
//!     .with_output("sample.csv")
//!     .with_limit(20);
//! let report = gfoods_ingest::run_job(&config).await?;
//! println!("{} rows resolved", report.resolved());
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod config;
pub mod dataset;
pub mod error;
pub mod ncbi;
pub mod opentree;
pub mod pipeline;
pub mod progress;
pub mod source;
pub mod throttle;
pub mod wikidata;

pub use config::RunConfig;
pub use error::{IngestError, LookupFailure, Result};
pub use pipeline::RunReport;
pub use source::{SynonymSource, build_source};

use clap::{Args, Parser, Subcommand};
use gfoods_common::types::{SourceKind, DEFAULT_CONTACT, DEFAULT_INPUT_PATH};
use std::path::PathBuf;
use std::time::Duration;

/// gFoods synonym scraper
#[derive(Parser, Debug)]
#[command(name = "gfoods-ingest")]
#[command(author, version, about = "Fill gFoods synonym columns from taxonomy services", long_about = None)]
pub struct Cli {
    /// Source to query
    #[command(subcommand)]
    pub source: Source,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Source {
    /// Open Tree of Life TNRS -> synonyms_open_tree_of_life
    #[command(name = "opentree", alias = "open-tree")]
    OpenTree(RunArgs),

    /// Wikidata aliases and P1420 -> synonyms_wiki_search
    #[command(name = "wikidata", alias = "wiki")]
    Wikidata(RunArgs),

    /// NCBI Taxonomy E-utilities -> synonyms_ncbi
    #[command(name = "ncbi")]
    Ncbi(RunArgs),
}

impl Source {
    pub fn kind(&self) -> SourceKind {
        match self {
            Source::OpenTree(_) => SourceKind::OpenTree,
            Source::Wikidata(_) => SourceKind::Wikidata,
            Source::Ncbi(_) => SourceKind::Ncbi,
        }
    }

    pub fn into_config(self) -> RunConfig {
        let kind = self.kind();
        match self {
            Source::OpenTree(args) | Source::Wikidata(args) | Source::Ncbi(args) => {
                args.into_config(kind)
            },
        }
    }
}

/// Options shared by every source job
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Input CSV
    #[arg(short, long, default_value = DEFAULT_INPUT_PATH)]
    pub input: PathBuf,

    /// Write here instead of overwriting the input
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Process only the first N eligible rows
    #[arg(short, long, value_name = "N")]
    pub limit: Option<usize>,

    /// Contact identifier sent with every request
    #[arg(long, env = "GFOODS_CONTACT", default_value = DEFAULT_CONTACT)]
    pub contact: String,

    /// Override the source's minimum gap between requests
    #[arg(long, value_name = "MS")]
    pub throttle_ms: Option<u64>,

    /// Override the source's batch size
    #[arg(long, value_name = "N")]
    pub batch_size: Option<usize>,

    /// Override the request timeout
    #[arg(long, value_name = "SECS")]
    pub timeout_secs: Option<u64>,

    /// Override the API base URL
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Value written for rows whose name matched nothing
    #[arg(long, value_name = "TEXT")]
    pub no_match_marker: Option<String>,
}

impl RunArgs {
    pub fn into_config(self, kind: SourceKind) -> RunConfig {
        let mut config = RunConfig::new(kind, self.input).with_contact(self.contact);

        if let Some(output) = self.output {
            config = config.with_output(output);
        }
        if let Some(limit) = self.limit {
            config = config.with_limit(limit);
        }
        if let Some(ms) = self.throttle_ms {
            config = config.with_throttle(Duration::from_millis(ms));
        }
        if let Some(size) = self.batch_size {
            config = config.with_batch_size(size);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout(Duration::from_secs(secs));
        }
        if let Some(url) = self.base_url {
            config = config.with_base_url(url);
        }
        if let Some(marker) = self.no_match_marker {
            config = config.with_no_match_marker(marker);
        }
        config
    }
}

/// Build the configured source and run it over the dataset
pub async fn run_job(config: &RunConfig) -> Result<RunReport> {
    let source = build_source(config)?;
    pipeline::run(source.as_ref(), config).await
}
