//! FILENAME: core/persistence/src/detail.rs
//! PURPOSE: Field catalog lookups and the detail-report section of snapshots.
//! CONTEXT: A detail report lists rows of one source table; its columns are
//! the fields dropped into the design grid, one per column, read left to
//! right. The catalog is supplied from outside and only translates field
//! names to display labels.

use report_engine::Grid;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    #[serde(default)]
    pub label: String,
}

/// Read-only list of the fields a data source offers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldCatalog {
    fields: Vec<FieldInfo>,
}

impl FieldCatalog {
    pub fn new(fields: Vec<FieldInfo>) -> Self {
        FieldCatalog { fields }
    }

    /// Non-empty label of a field, if the catalog knows one.
    pub fn label_for(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.label.as_str())
            .filter(|label| !label.is_empty())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Field offered as a query filter on the rendered report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterField {
    pub table: String,
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Data source picked in the detail-report toolbar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceSelection {
    pub data_source: String,
    pub table: String,
    #[serde(default)]
    pub schema: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailReportConfig {
    pub selected_data_source: String,
    pub selected_table: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub selected_schema: String,
    #[serde(default)]
    pub selected_cols: Vec<String>,
    #[serde(default)]
    pub field_labels: BTreeMap<String, String>,
}

impl DetailReportConfig {
    pub fn source(&self) -> DataSourceSelection {
        DataSourceSelection {
            data_source: self.selected_data_source.clone(),
            table: self.selected_table.clone(),
            schema: self.selected_schema.clone(),
        }
    }
}

/// Builds the detail-report section from the fields bound in the grid.
///
/// Each column contributes its topmost field; columns are listed left to
/// right. Labels are looked up for the selected columns and the filter
/// fields.
pub fn collect_detail_config(
    grid: &Grid,
    source: &DataSourceSelection,
    catalog: &FieldCatalog,
    filter_fields: &[FilterField],
) -> DetailReportConfig {
    let mut by_column: BTreeMap<u32, String> = BTreeMap::new();
    for ((_, col), binding) in grid.field_cells() {
        by_column.entry(col).or_insert_with(|| binding.field.clone());
    }
    let selected_cols: Vec<String> = by_column.into_values().collect();

    let mut field_labels = BTreeMap::new();
    let names = selected_cols
        .iter()
        .map(String::as_str)
        .chain(filter_fields.iter().map(|f| f.field.as_str()));
    for name in names {
        if let Some(label) = catalog.label_for(name) {
            field_labels
                .entry(name.to_string())
                .or_insert_with(|| label.to_string());
        }
    }

    DetailReportConfig {
        selected_data_source: source.data_source.clone(),
        selected_table: source.table.clone(),
        selected_schema: source.schema.clone(),
        selected_cols,
        field_labels,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use report_engine::FieldBinding;

    fn catalog() -> FieldCatalog {
        FieldCatalog::new(vec![
            FieldInfo { name: "amount".to_string(), label: "Amount".to_string() },
            FieldInfo { name: "region".to_string(), label: "Region".to_string() },
            FieldInfo { name: "note".to_string(), label: String::new() },
            FieldInfo { name: "posted_at".to_string(), label: "Posted".to_string() },
        ])
    }

    #[test]
    fn test_label_lookup() {
        let catalog = catalog();
        assert_eq!(catalog.label_for("amount"), Some("Amount"));
        assert_eq!(catalog.label_for("note"), None);
        assert_eq!(catalog.label_for("missing"), None);
    }

    #[test]
    fn test_selected_cols_follow_column_order() {
        let mut grid = Grid::new(3, 4);
        grid.bind_field(2, 3, FieldBinding::new("ledger", "amount")).unwrap();
        grid.bind_field(1, 0, FieldBinding::new("ledger", "region")).unwrap();
        grid.bind_field(0, 2, FieldBinding::new("ledger", "note")).unwrap();

        let source = DataSourceSelection {
            data_source: "erp".to_string(),
            table: "ledger".to_string(),
            schema: String::new(),
        };
        let filters = vec![FilterField {
            table: "ledger".to_string(),
            field: "posted_at".to_string(),
            display_name: None,
        }];
        let config = collect_detail_config(&grid, &source, &catalog(), &filters);

        assert_eq!(config.selected_cols, vec!["region", "note", "amount"]);
        assert_eq!(config.field_labels.len(), 3);
        assert_eq!(config.field_labels["posted_at"], "Posted");
        assert!(!config.field_labels.contains_key("note"));
        assert_eq!(config.source(), source);
    }
}
