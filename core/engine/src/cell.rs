//! FILENAME: core/engine/src/cell.rs
//! PURPOSE: Defines the data structures for a single design-grid cell.
//! CONTEXT: A `DesignCell` carries what the user typed, what kind of content
//! it is (plain text, a bound data field, an indicator), explicit style
//! overrides, extra data attributes and its merge layout (span / hidden).

use crate::style::StyleOverrides;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Text that only looks like a row number or a column letter run.
static LABEL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:[0-9]+|[A-Z]+)$").expect("valid label pattern"));

/// Kind of content a cell holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum CellType {
    #[default]
    Text,
    Field,
    Indicator,
    /// Any other type string found in imported documents, kept verbatim.
    Other(String),
}

impl CellType {
    pub fn as_str(&self) -> &str {
        match self {
            CellType::Text => "text",
            CellType::Field => "field",
            CellType::Indicator => "indicator",
            CellType::Other(s) => s,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "" | "text" => CellType::Text,
            "field" => CellType::Field,
            "indicator" => CellType::Indicator,
            other => CellType::Other(other.to_string()),
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, CellType::Text)
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CellType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CellType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(CellType::parse(&s))
    }
}

/// Binding of a cell to a column of a source table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldBinding {
    pub table: String,
    pub field: String,
    pub display_name: String,
}

impl FieldBinding {
    pub fn new(table: impl Into<String>, field: impl Into<String>) -> Self {
        let field = field.into();
        FieldBinding {
            table: table.into(),
            display_name: field.clone(),
            field,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }
}

/// The atomic unit of the design grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignCell {
    pub content: String,
    pub cell_type: CellType,
    pub style: StyleOverrides,
    pub binding: Option<FieldBinding>,
    /// Extra `data-*` style attributes (without the prefix).
    pub data: BTreeMap<String, String>,
    pub row_span: u32,
    pub col_span: u32,
    /// Suppressed because it lies inside another cell's merged region.
    pub hidden: bool,
}

impl DesignCell {
    pub fn new() -> Self {
        DesignCell {
            content: String::new(),
            cell_type: CellType::Text,
            style: StyleOverrides::new(),
            binding: None,
            data: BTreeMap::new(),
            row_span: 1,
            col_span: 1,
            hidden: false,
        }
    }

    pub fn new_text(text: impl Into<String>) -> Self {
        DesignCell {
            content: text.into(),
            ..Self::new()
        }
    }

    /// Removes the cell's type, binding and data attributes.
    /// Style is kept; it is cleared separately through the toolbar.
    pub fn purge_metadata(&mut self) {
        self.cell_type = CellType::Text;
        self.binding = None;
        self.data.clear();
    }

    pub fn is_merged_anchor(&self) -> bool {
        self.row_span > 1 || self.col_span > 1
    }

    pub fn reset_layout(&mut self) {
        self.row_span = 1;
        self.col_span = 1;
        self.hidden = false;
    }

    /// Whether the cell carries anything worth persisting.
    ///
    /// Bare integers and bare uppercase letter runs are treated as row/column
    /// labels, not content.
    pub fn is_configured(&self) -> bool {
        let trimmed = self.content.trim();
        if !trimmed.is_empty() && !LABEL_PATTERN.is_match(trimmed) {
            return true;
        }
        if !self.cell_type.is_text() {
            return true;
        }
        if self.binding.is_some() || !self.data.is_empty() {
            return true;
        }
        if self.is_merged_anchor() {
            return true;
        }
        self.style.has_non_default()
    }
}

impl Default for DesignCell {
    fn default() -> Self {
        Self::new()
    }
}
