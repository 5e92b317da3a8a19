//! FILENAME: core/persistence/src/applier.rs
//! PURPOSE: Pushes a table snapshot back into the live design state.
//! CONTEXT: Application is best effort. Only a document that is not a JSON
//! object is rejected outright; bad records, bad style properties and cells
//! beyond the current table are logged and skipped, and the returned report
//! says how much was applied. Existing cells are mutated in place; the grid
//! is never rebuilt or resized.

use crate::config_store::CellConfigStore;
use crate::detail::{DetailReportConfig, FilterField};
use crate::error::ApplyError;
use report_engine::{CellRef, CellType, DesignCell, FieldBinding, Grid, MergeRecord, MergeTracker};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    /// Non-null `tableData` records with a usable position.
    pub attempted: usize,
    pub applied: usize,
    /// Records whose position lies outside the current table.
    pub skipped: usize,
    pub configs_imported: usize,
    pub merges_applied: usize,
    pub detail_report_config: Option<DetailReportConfig>,
    pub filter_fields: Option<Vec<FilterField>>,
}

impl ApplyReport {
    pub fn is_partial(&self) -> bool {
        self.applied < self.attempted
    }
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_as_index(value: Option<&Value>) -> Option<u32> {
    value?.as_u64().and_then(|v| u32::try_from(v).ok())
}

/// Applies one `tableData` record: text, style properties one by one, type
/// and data attributes, then spans.
fn apply_record(cell: &mut DesignCell, record: &Map<String, Value>, (row, col): (u32, u32)) {
    if let Some(text) = record.get("value").and_then(value_as_string) {
        cell.content = text;
    }

    if let Some(style) = record.get("style").and_then(Value::as_object) {
        for (prop, value) in style {
            let Some(value) = value_as_string(value) else {
                log::warn!("style {} on ({}, {}) has a non-text value, skipped", prop, row, col);
                continue;
            };
            if let Err(e) = cell.style.set_named(prop, &value) {
                log::warn!("cannot apply style to ({}, {}): {}", row, col, e);
            }
        }
    }

    if let Some(t) = record.get("type").and_then(Value::as_str) {
        cell.cell_type = CellType::parse(t);
    }

    if let Some(data) = record.get("data").and_then(Value::as_object) {
        if cell.cell_type == CellType::Field {
            let get = |key: &str| data.get(key).and_then(value_as_string);
            if let Some(field) = get("field") {
                let mut binding = FieldBinding::new(get("table").unwrap_or_default(), field);
                if let Some(display) = get("displayName").filter(|d| !d.is_empty()) {
                    binding.display_name = display;
                }
                cell.binding = Some(binding);
            }
        } else {
            for (key, value) in data {
                if let Some(value) = value_as_string(value) {
                    cell.data.insert(key.clone(), value);
                }
            }
        }
    }

    if let Some(span) = value_as_index(record.get("colspan")).filter(|s| *s >= 1) {
        cell.col_span = span;
    }
    if let Some(span) = value_as_index(record.get("rowspan")).filter(|s| *s >= 1) {
        cell.row_span = span;
    }
}

fn parse_merge_info(info: &Map<String, Value>) -> BTreeMap<CellRef, MergeRecord> {
    let mut records = BTreeMap::new();
    for (key, value) in info {
        let Some(cell_ref) = CellRef::parse(key) else {
            log::warn!("ignoring merge info for bad cell reference: {}", key);
            continue;
        };
        match serde_json::from_value::<MergeRecord>(value.clone()) {
            Ok(record) => {
                records.insert(cell_ref, record);
            }
            Err(e) => log::warn!("ignoring merge info for {}: {}", key, e),
        }
    }
    records
}

/// Applies a snapshot document to the design state.
pub fn apply_snapshot(
    document: &Value,
    grid: &mut Grid,
    merges: &mut MergeTracker,
    configs: &mut CellConfigStore,
) -> Result<ApplyReport, ApplyError> {
    let Some(doc) = document.as_object() else {
        return Err(ApplyError::InvalidFormat(
            "table configuration must be a JSON object".to_string(),
        ));
    };
    let mut report = ApplyReport::default();

    if let Some(value) = doc.get("detailReportConfig").filter(|v| !v.is_null()) {
        match serde_json::from_value::<DetailReportConfig>(value.clone()) {
            Ok(config) => report.detail_report_config = Some(config),
            Err(e) => log::warn!("ignoring unreadable detailReportConfig: {}", e),
        }
    }

    if let Some(value) = doc.get("filterFields").filter(|v| !v.is_null()) {
        match serde_json::from_value::<Vec<FilterField>>(value.clone()) {
            Ok(fields) => report.filter_fields = Some(fields),
            Err(e) => log::warn!("ignoring unreadable filterFields: {}", e),
        }
    }

    if let Some(records) = doc.get("cellConfigurations").and_then(Value::as_object) {
        report.configs_imported = configs.import_all(records);
    }

    let merge_info = doc.get("cellMergeInfo").and_then(Value::as_object);
    if merge_info.is_some() {
        // Old regions must not linger under the spans about to be written.
        merges.reset_layout(grid);
    }

    if let Some(rows) = doc.get("tableData").and_then(Value::as_array) {
        for record in rows.iter().filter_map(Value::as_array).flatten() {
            let Some(record) = record.as_object() else {
                continue;
            };
            let (Some(row), Some(col)) = (
                value_as_index(record.get("rowIndex")),
                value_as_index(record.get("cellIndex")),
            ) else {
                log::warn!("tableData record without a usable rowIndex/cellIndex, skipped");
                continue;
            };
            report.attempted += 1;
            match grid.cell_mut(row, col) {
                Some(cell) => {
                    apply_record(cell, record, (row, col));
                    report.applied += 1;
                }
                None => {
                    log::warn!("tableData record ({}, {}) lies outside the table, skipped", row, col);
                    report.skipped += 1;
                }
            }
        }
    }

    if let Some(info) = merge_info {
        report.merges_applied = merges.replace_all(grid, parse_merge_info(info));
    }
    // Layout comes from the merge records only; spans in tableData without a
    // matching anchor are dropped.
    merges.sync_grid(grid);

    log::info!(
        "applied table configuration: {}/{} cells, {} configs, {} merged regions",
        report.applied,
        report.attempted,
        report.configs_imported,
        report.merges_applied
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_store::{CellConfigPatch, ConfigProfile};
    use crate::serializer::{serialize_table, SerializeOptions};
    use crate::storage::MemoryStore;
    use report_engine::StyleProperty;
    use serde_json::json;

    fn configs() -> CellConfigStore {
        CellConfigStore::new(Box::new(MemoryStore::new()), ConfigProfile::Full)
    }

    fn revenue_table() -> (Grid, MergeTracker) {
        let mut grid = Grid::new(3, 3);
        grid.set_content(1, 1, "Revenue");
        grid.cell_mut(1, 1).unwrap().cell_type = CellType::Field;
        let mut merges = MergeTracker::new();
        merges.merge(&mut grid, &[(1, 1), (1, 2), (2, 1), (2, 2)]).unwrap();
        (grid, merges)
    }

    #[test]
    fn test_rejects_non_object_documents() {
        let mut grid = Grid::new(2, 2);
        let before = grid.clone();
        let result = apply_snapshot(&json!("nope"), &mut grid, &mut MergeTracker::new(), &mut configs());
        assert!(matches!(result, Err(ApplyError::InvalidFormat(_))));
        assert_eq!(grid, before);
    }

    #[test]
    fn test_revenue_round_trip_on_blank_table() {
        let (grid, merges) = revenue_table();
        let snapshot = serialize_table(&grid, &merges, &configs(), &SerializeOptions::default());
        let document = snapshot.to_value().unwrap();

        let mut blank = Grid::new(3, 3);
        let mut blank_merges = MergeTracker::new();
        let report = apply_snapshot(&document, &mut blank, &mut blank_merges, &mut configs()).unwrap();

        assert_eq!(report.merges_applied, 1);
        let anchor = blank.cell(1, 1).unwrap();
        assert_eq!(anchor.content, "Revenue");
        assert_eq!((anchor.row_span, anchor.col_span), (2, 2));
        for pos in [(1, 2), (2, 1), (2, 2)] {
            assert!(blank.cell(pos.0, pos.1).unwrap().hidden);
        }
        assert_eq!(blank_merges.records(), merges.records());
    }

    #[test]
    fn test_serialize_apply_is_idempotent() {
        let (mut grid, mut merges) = revenue_table();
        grid.set_content(0, 0, "Region");
        grid.cell_mut(0, 0).unwrap().style.set(StyleProperty::TextAlign, "center");
        grid.bind_field(0, 2, FieldBinding::new("ledger", "amount")).unwrap();
        grid.cell_mut(0, 1).unwrap().data.insert("source".to_string(), "ledger".to_string());
        let mut store = configs();
        store.set(
            &CellRef::new(0, 0),
            &CellConfigPatch { unit: Some("k".to_string()), ..Default::default() },
        );
        merges.unmerge(&mut grid, &[(1, 1)]).unwrap();
        merges.merge(&mut grid, &[(1, 0), (2, 0)]).unwrap();

        let first = serialize_table(&grid, &merges, &store, &SerializeOptions::default());
        let document = first.to_value().unwrap();

        let mut fresh = Grid::new(3, 3);
        let mut fresh_merges = MergeTracker::new();
        let mut fresh_store = configs();
        apply_snapshot(&document, &mut fresh, &mut fresh_merges, &mut fresh_store).unwrap();
        let second = serialize_table(&fresh, &fresh_merges, &fresh_store, &SerializeOptions::default());

        assert_eq!(second.table_data, first.table_data);
        assert_eq!(second.cell_merge_info, first.cell_merge_info);
        assert_eq!(second.cell_configurations, first.cell_configurations);

        // Applying again changes nothing observable.
        let after_first = fresh.clone();
        apply_snapshot(&document, &mut fresh, &mut fresh_merges, &mut fresh_store).unwrap();
        assert_eq!(fresh, after_first);
    }

    #[test]
    fn test_out_of_bounds_records_are_skipped() {
        let document = json!({
            "tableData": [
                [ { "value": "Kept", "type": "text", "rowIndex": 0, "cellIndex": 0 } ],
                [ null, { "value": "Lost", "type": "text", "rowIndex": 9, "cellIndex": 1 } ],
                [ { "value": "No position" } ]
            ]
        });
        let mut grid = Grid::new(2, 2);
        let report = apply_snapshot(&document, &mut grid, &mut MergeTracker::new(), &mut configs()).unwrap();

        assert_eq!((report.attempted, report.applied, report.skipped), (2, 1, 1));
        assert!(report.is_partial());
        assert_eq!(grid.cell(0, 0).unwrap().content, "Kept");
    }

    #[test]
    fn test_bad_style_property_does_not_stop_the_rest() {
        let document = json!({
            "tableData": [[ {
                "value": "x", "type": "text", "rowIndex": 0, "cellIndex": 0,
                "style": { "border": "1px solid", "fontWeight": "bold", "color": 5, "fontStyle": "italic" }
            } ]]
        });
        let mut grid = Grid::new(1, 1);
        apply_snapshot(&document, &mut grid, &mut MergeTracker::new(), &mut configs()).unwrap();

        let style = &grid.cell(0, 0).unwrap().style;
        assert_eq!(style.get(StyleProperty::FontWeight), Some("bold"));
        assert_eq!(style.get(StyleProperty::FontStyle), Some("italic"));
        assert_eq!(style.get(StyleProperty::Color), Some("5"));
        assert_eq!(style.len(), 3);
    }

    #[test]
    fn test_legacy_merge_refs_and_dangling_entries() {
        let document = json!({
            "cellMergeInfo": {
                "R1C1": { "rowSpan": 1, "colSpan": 2, "rowIndex": 0, "cellIndex": 0 },
                "R1C2": { "mergedInto": "R1C1", "hidden": true },
                "R2C2": { "mergedInto": "R6C6", "hidden": true },
                "garbage": { "rowSpan": 2 }
            }
        });
        let mut grid = Grid::new(2, 2);
        let mut merges = MergeTracker::new();
        let report = apply_snapshot(&document, &mut grid, &mut merges, &mut configs()).unwrap();

        assert_eq!(report.merges_applied, 1);
        assert_eq!(merges.len(), 2);
        assert_eq!(merges.anchor_of((0, 1)), Some(CellRef::parse("A1").unwrap()));
        assert!(!grid.cell(1, 1).unwrap().hidden);
    }

    #[test]
    fn test_spans_without_merge_info_are_dropped() {
        let document = json!({
            "tableData": [[ { "value": "Wide", "type": "text", "rowIndex": 0, "cellIndex": 0, "colspan": 2 } ]]
        });
        let mut grid = Grid::new(2, 2);
        let mut merges = MergeTracker::new();
        apply_snapshot(&document, &mut grid, &mut merges, &mut configs()).unwrap();

        assert_eq!(grid.cell(0, 0).unwrap().col_span, 1);
        assert!(merges.is_empty());
        // The cell is an ordinary cell again and can be merged.
        assert!(merges.merge(&mut grid, &[(0, 0), (0, 1)]).is_ok());
    }

    #[test]
    fn test_spans_of_dropped_anchor_are_dropped() {
        let document = json!({
            "tableData": [[ { "value": "Tall", "type": "text", "rowIndex": 0, "cellIndex": 0, "rowspan": 4 } ]],
            "cellMergeInfo": {
                "A1": { "rowSpan": 4, "colSpan": 1, "rowIndex": 0, "cellIndex": 0 },
                "A2": { "mergedInto": "A1", "hidden": true }
            }
        });
        let mut grid = Grid::new(2, 2);
        let mut merges = MergeTracker::new();
        let report = apply_snapshot(&document, &mut grid, &mut merges, &mut configs()).unwrap();

        assert_eq!(report.merges_applied, 0);
        assert!(merges.is_empty());
        let a1 = grid.cell(0, 0).unwrap();
        assert_eq!((a1.row_span, a1.col_span), (1, 1));
        assert!(!grid.cell(1, 0).unwrap().hidden);
    }

    #[test]
    fn test_overlapping_imported_anchors_keep_first() {
        let document = json!({
            "cellMergeInfo": {
                "A1": { "rowSpan": 2, "colSpan": 2, "rowIndex": 0, "cellIndex": 0 },
                "B2": { "rowSpan": 2, "colSpan": 2, "rowIndex": 1, "cellIndex": 1 }
            }
        });
        let mut grid = Grid::new(3, 3);
        let mut merges = MergeTracker::new();
        let report = apply_snapshot(&document, &mut grid, &mut merges, &mut configs()).unwrap();

        assert_eq!(report.merges_applied, 1);
        assert_eq!(merges.regions().len(), 1);
        assert!(grid.cell(1, 1).unwrap().hidden);
        assert!(!grid.cell(2, 2).unwrap().hidden);
    }

    #[test]
    fn test_multibyte_color_serializes() {
        let document = json!({
            "tableData": [[ { "value": "", "rowIndex": 0, "cellIndex": 0, "style": { "backgroundColor": "#aéaaa" } } ]]
        });
        let mut grid = Grid::new(1, 1);
        let merges = MergeTracker::new();
        let store = configs();
        apply_snapshot(&document, &mut grid, &mut MergeTracker::new(), &mut configs()).unwrap();

        let snapshot = serialize_table(&grid, &merges, &store, &SerializeOptions::default());
        let record = snapshot.table_data[0][0].as_ref().unwrap();
        assert_eq!(
            record.style.as_ref().unwrap().get("backgroundColor").map(String::as_str),
            Some("#aéaaa")
        );
    }

    #[test]
    fn test_detail_sections_are_reported() {
        let document = json!({
            "detailReportConfig": {
                "selectedDataSource": "erp", "selectedTable": "ledger",
                "selectedCols": ["amount"], "fieldLabels": { "amount": "Amount" }
            },
            "filterFields": [ { "table": "ledger", "field": "region" } ],
            "cellConfigurations": { "A1": { "type": "indicator", "source": "rev" } }
        });
        let mut store = configs();
        let report = apply_snapshot(&document, &mut Grid::new(1, 1), &mut MergeTracker::new(), &mut store).unwrap();

        assert_eq!(report.detail_report_config.unwrap().selected_cols, vec!["amount"]);
        assert_eq!(report.filter_fields.unwrap()[0].field, "region");
        assert_eq!(report.configs_imported, 1);
        assert_eq!(store.get(&CellRef::new(0, 0)).unwrap().source, "rev");
    }
}
