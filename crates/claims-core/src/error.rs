use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the claims audit crates.
#[derive(Error, Debug)]
pub enum AuditError {
    /// A table file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// An input table is entirely absent, so no aggregation is possible.
    #[error("Required input table missing: {0}")]
    MissingTable(&'static str),

    /// The expected data directory does not exist.
    #[error("Data path not found: {0}")]
    DataPathNotFound(PathBuf),

    /// A policy threshold is negative, non-finite or out of range.
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),
}

/// Convenience alias used throughout the audit crates.
pub type Result<T> = std::result::Result<T, AuditError>;
