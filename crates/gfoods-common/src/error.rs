//! Error types shared by gFoods crates

use thiserror::Error;

/// Result type alias for common operations
pub type Result<T> = std::result::Result<T, CommonError>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CommonError {
    #[error("Unknown synonym source '{0}'. Expected one of: opentree, wikidata, ncbi")]
    UnknownSource(String),
}
