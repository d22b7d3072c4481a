// ❗ Seed Errors - everything that aborts a run
// Soft failures (unresolvable printers, orphaned characters) are logged, never returned

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse CSV in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Expected a JSON array of records in {}", path.display())]
    NotAnArray { path: PathBuf },

    #[error("{entity} record #{index} is missing required field '{field}'")]
    MissingField {
        entity: &'static str,
        field: &'static str,
        index: usize,
    },

    #[error("Store error: {0}")]
    Store(#[from] rusqlite::Error),

    #[error("Serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SeedError>;
