//! gFoods Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared pieces of the gFoods synonym tooling:
//!
//! - **Logging**: `tracing` subscriber setup driven by `LogConfig`
//! - **Types**: the three synonym sources, their columns and request defaults
//! - **Synonyms**: `SynonymSet` and the canonical `;`-joined cell format
//!
//! # Example
//!
//! ```
//! use gfoods_common::synonyms::normalize;
//! use gfoods_common::types::SourceKind;
//!
//! assert_eq!(SourceKind::OpenTree.column(), "synonyms_open_tree_of_life");
//! assert_eq!(normalize(["Allium sativum L.", "", "Allium sativum L."]), "Allium sativum L.");
//! ```

pub mod error;
pub mod logging;
pub mod synonyms;
pub mod types;

pub use error::{CommonError, Result};
pub use synonyms::SynonymSet;
pub use types::SourceKind;
