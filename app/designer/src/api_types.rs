//! FILENAME: app/designer/src/api_types.rs
// PURPOSE: Shared type definitions for the command boundary.
// CONTEXT: All structs use camelCase serialization so a UI shell can consume
// them as JSON.

use report_engine::{coord_to_a1, DesignCell, MergedRegion};
use report_persistence::{ApplyReport, CellConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Cell data returned to the UI after a change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellData {
    pub row: u32,
    pub col: u32,
    pub cell_ref: String,
    pub content: String,
    pub cell_type: String,
    #[serde(default)]
    pub style: BTreeMap<String, String>,
    /// Number of rows this cell spans (1 = normal, >1 = merge anchor)
    pub row_span: u32,
    /// Number of columns this cell spans (1 = normal, >1 = merge anchor)
    pub col_span: u32,
    pub hidden: bool,
}

impl CellData {
    pub fn from_cell(row: u32, col: u32, cell: &DesignCell) -> Self {
        CellData {
            row,
            col,
            cell_ref: coord_to_a1((row, col)),
            content: cell.content.clone(),
            cell_type: cell.cell_type.as_str().to_string(),
            style: cell.style.to_css_map(),
            row_span: cell.row_span,
            col_span: cell.col_span,
            hidden: cell.hidden,
        }
    }
}

/// What the side panel shows for the selected cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellInfo {
    pub cell: CellData,
    pub config: CellConfig,
    /// Region containing the cell, when it is merged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merge: Option<MergedRegion>,
}

/// Result of merge operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeResult {
    pub success: bool,
    pub merged_regions: Vec<MergedRegion>,
    pub updated_cells: Vec<CellData>,
}

/// Toolbar actions, applied to every selected cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "value", rename_all = "camelCase")]
pub enum FormatAction {
    ToggleBold,
    ToggleItalic,
    ToggleUnderline,
    FontColor(String),
    BackgroundColor(String),
    FontSize(String),
    Align(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Info,
    Warning,
    Error,
}

/// Toast shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Notification {
            title: title.into(),
            message: message.into(),
            kind: NotificationKind::Success,
        }
    }

    pub fn warning(title: impl Into<String>, message: impl Into<String>) -> Self {
        Notification {
            title: title.into(),
            message: message.into(),
            kind: NotificationKind::Warning,
        }
    }

    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Notification {
            title: title.into(),
            message: message.into(),
            kind: NotificationKind::Error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == NotificationKind::Success
    }
}

/// Tree node the report is saved under on the remote panel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeInfo {
    pub node_name: String,
    pub node_type: String,
    pub parent_code: String,
    /// Set once the node exists remotely; saving then updates it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node_code: Option<String>,
}

pub const DEFAULT_PARENT_CODE: &str = "000";

impl Default for NodeInfo {
    fn default() -> Self {
        NodeInfo {
            node_name: String::new(),
            node_type: "指标报表".to_string(),
            parent_code: DEFAULT_PARENT_CODE.to_string(),
            node_id: None,
            node_code: None,
        }
    }
}

/// Counts reported after a document was applied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplySummary {
    pub attempted: usize,
    pub applied: usize,
    pub skipped: usize,
    pub configs_imported: usize,
    pub merges_applied: usize,
}

impl From<&ApplyReport> for ApplySummary {
    fn from(report: &ApplyReport) -> Self {
        ApplySummary {
            attempted: report.attempted,
            applied: report.applied,
            skipped: report.skipped,
            configs_imported: report.configs_imported,
            merges_applied: report.merges_applied,
        }
    }
}

impl ApplySummary {
    pub fn is_partial(&self) -> bool {
        self.applied < self.attempted
    }
}
