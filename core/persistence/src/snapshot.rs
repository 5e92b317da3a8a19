//! FILENAME: core/persistence/src/snapshot.rs
//! PURPOSE: The table snapshot exchange format.
//! CONTEXT: A snapshot is a standalone, point-in-time copy of the design
//! table: plain owned data with no back-reference to the live grid. The JSON
//! shape (camelCase keys, `null` placeholders in `tableData`) is shared with
//! the remote panel API and exported files.

use crate::detail::{DetailReportConfig, FilterField};
use crate::error::PersistenceError;
use chrono::{SecondsFormat, Utc};
use report_engine::{CellRef, MergeRecord};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const SNAPSHOT_VERSION: &str = "1.0";

// ============================================================================
// METADATA
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub version: String,
    /// ISO-8601 UTC timestamp with milliseconds.
    pub created: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<String>,
}

impl SnapshotMetadata {
    pub fn now(title: impl Into<String>, node_type: Option<String>) -> Self {
        SnapshotMetadata {
            version: SNAPSHOT_VERSION.to_string(),
            created: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            title: title.into(),
            node_type,
        }
    }
}

// ============================================================================
// CELL RECORD
// ============================================================================

/// One configured cell in `tableData`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellRecord {
    pub value: String,
    #[serde(rename = "type")]
    pub cell_type: String,
    pub row_index: u32,
    pub cell_index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colspan: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rowspan: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<BTreeMap<String, String>>,
}

// ============================================================================
// SNAPSHOT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSnapshot {
    pub metadata: SnapshotMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_report_config: Option<DetailReportConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter_fields: Option<Vec<FilterField>>,
    #[serde(default)]
    pub cell_configurations: Map<String, Value>,
    #[serde(default)]
    pub cell_merge_info: BTreeMap<CellRef, MergeRecord>,
    /// Rows holding at least one configured cell; slot `c` of a row is the
    /// record for column `c` or `null`.
    #[serde(default)]
    pub table_data: Vec<Vec<Option<CellRecord>>>,
}

impl TableSnapshot {
    pub fn to_value(&self) -> Result<Value, PersistenceError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, PersistenceError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Strict typed parse. The applier works on raw JSON instead so that a
    /// partly malformed document can still be applied.
    pub fn from_value(value: Value) -> Result<Self, PersistenceError> {
        if !value.is_object() {
            return Err(PersistenceError::InvalidFormat(
                "table configuration must be a JSON object".to_string(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Number of configured cells recorded in `tableData`.
    pub fn record_count(&self) -> usize {
        self.table_data.iter().flatten().flatten().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata_timestamp_format() {
        let meta = SnapshotMetadata::now("Monthly", None);
        assert_eq!(meta.version, "1.0");
        assert!(meta.created.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&meta.created).is_ok());
    }

    #[test]
    fn test_snapshot_json_shape() {
        let snapshot = TableSnapshot {
            metadata: SnapshotMetadata {
                version: "1.0".to_string(),
                created: "2024-01-01T00:00:00.000Z".to_string(),
                title: "T".to_string(),
                node_type: None,
            },
            detail_report_config: None,
            filter_fields: None,
            cell_configurations: Map::new(),
            cell_merge_info: BTreeMap::new(),
            table_data: vec![vec![
                None,
                Some(CellRecord {
                    value: "Revenue".to_string(),
                    cell_type: "text".to_string(),
                    row_index: 0,
                    cell_index: 1,
                    colspan: None,
                    rowspan: None,
                    style: None,
                    data: None,
                }),
            ]],
        };

        assert_eq!(
            snapshot.to_value().unwrap(),
            json!({
                "metadata": { "version": "1.0", "created": "2024-01-01T00:00:00.000Z", "title": "T" },
                "cellConfigurations": {},
                "cellMergeInfo": {},
                "tableData": [[null, { "value": "Revenue", "type": "text", "rowIndex": 0, "cellIndex": 1 }]]
            })
        );
        assert_eq!(snapshot.record_count(), 1);
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(matches!(
            TableSnapshot::from_value(json!([1, 2])),
            Err(PersistenceError::InvalidFormat(_))
        ));
    }
}
