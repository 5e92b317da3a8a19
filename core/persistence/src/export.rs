//! FILENAME: core/persistence/src/export.rs
//! PURPOSE: Writing snapshots to export files and reading them back.

use crate::error::PersistenceError;
use crate::snapshot::TableSnapshot;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

/// `<base>_<timestamp>.json`, the timestamp being ISO-8601 with `:` and `.`
/// replaced so the name is valid on every filesystem.
pub fn export_file_name(base_name: &str, at: DateTime<Utc>) -> String {
    let stamp = at
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-");
    format!("{}_{}.json", base_name, stamp)
}

/// Writes the snapshot as pretty JSON into `dir` and returns the file path.
pub fn export_snapshot(
    snapshot: &TableSnapshot,
    dir: &Path,
    base_name: &str,
) -> Result<PathBuf, PersistenceError> {
    fs::create_dir_all(dir)?;
    let path = dir.join(export_file_name(base_name, Utc::now()));
    fs::write(&path, snapshot.to_json_pretty()?)?;
    log::info!("exported table configuration to {}", path.display());
    Ok(path)
}

/// Reads an exported document. Anything other than a JSON object is
/// rejected with `InvalidFormat`.
pub fn import_document(path: &Path) -> Result<Value, PersistenceError> {
    let text = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&text).map_err(|e| {
        PersistenceError::InvalidFormat(format!("{} is not valid JSON: {}", path.display(), e))
    })?;
    if !value.is_object() {
        return Err(PersistenceError::InvalidFormat(format!(
            "{} does not contain a table configuration object",
            path.display()
        )));
    }
    Ok(value)
}
