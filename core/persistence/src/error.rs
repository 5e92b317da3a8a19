//! FILENAME: core/persistence/src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid file format: {0}")]
    InvalidFormat(String),

    #[error("Storage quota exceeded writing '{key}' ({needed} bytes needed, {quota} allowed)")]
    QuotaExceeded {
        key: String,
        needed: usize,
        quota: usize,
    },

    #[error("Storage unavailable: {0}")]
    Storage(String),
}

/// Failure to apply a table snapshot at all. Problems with individual
/// records are reported through `ApplyReport` instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApplyError {
    #[error("Invalid table configuration: {0}")]
    InvalidFormat(String),
}
