//! FILENAME: tests/test_snapshot_commands.rs
//! Integration tests for snapshots, export/import, configuration reset and
//! the viewer hand-off.

mod common;

use common::{assert_cell_text, TestHarness};
use designer_lib::cell_commands::{drop_field, select_cell};
use designer_lib::merge_commands::merge_selection;
use designer_lib::snapshot_commands::{
    apply_document, clear_all_configs, current_snapshot, export_config, import_config,
    load_last_viewed, save_last_viewed,
};
use designer_lib::{
    set_column_widths, set_data_source, set_field_catalog, set_node_info, DesignerSettings,
    FormatAction, NodeInfo,
};
use report_engine::CellType;
use report_persistence::{DataSourceSelection, FieldCatalog, FieldInfo};
use serde_json::json;

/// Sample report with a merged title, a bold header row and a bound field.
fn designed_report() -> TestHarness {
    let harness = TestHarness::with_sample_data();
    harness.select_range((0, 0), (0, 2));
    merge_selection(&harness.state).unwrap();
    harness.select_range((1, 0), (1, 2));
    designer_lib::cell_commands::apply_formatting(&harness.state, FormatAction::ToggleBold).unwrap();
    drop_field(&harness.state, 2, 1, "sales", "amount", None).unwrap();
    harness
}

// ============================================================================
// SNAPSHOT ROUND TRIP
// ============================================================================

#[test]
fn test_snapshot_shape() {
    let harness = designed_report();
    set_node_info(
        &harness.state,
        NodeInfo { node_name: "Income".to_string(), ..NodeInfo::default() },
    )
    .unwrap();

    let snapshot = current_snapshot(&harness.state).unwrap();
    let value = snapshot.to_value().unwrap();

    assert_eq!(value["metadata"]["title"], "Income");
    assert_eq!(value["metadata"]["nodeType"], "指标报表");
    assert_eq!(value["cellMergeInfo"]["A1"], json!({ "rowSpan": 1, "colSpan": 3, "rowIndex": 0, "cellIndex": 0 }));
    assert_eq!(value["cellMergeInfo"]["B1"], json!({ "mergedInto": "A1", "hidden": true }));
    // Slot position equals column.
    assert_eq!(value["tableData"][2][1]["value"], "{amount}");
    assert_eq!(value["tableData"][2][1]["data"]["field"], "amount");
    assert!(value["tableData"][2][2].is_null());
    assert!(value.get("detailReportConfig").is_none());
    assert_eq!(snapshot.record_count(), 6);
}

#[test]
fn test_untitled_snapshot() {
    let harness = TestHarness::new();
    let snapshot = current_snapshot(&harness.state).unwrap();
    assert_eq!(snapshot.metadata.title, "Untitled table");
    assert!(snapshot.table_data.is_empty());
}

#[test]
fn test_apply_reproduces_design() {
    let source = designed_report();
    let document = current_snapshot(&source.state).unwrap().to_value().unwrap();

    let target = TestHarness::with_size(5, 4);
    let summary = apply_document(&target.state, &document).unwrap();

    assert_eq!(summary.attempted, 6);
    assert_eq!(summary.applied, 6);
    assert_eq!(summary.merges_applied, 1);
    assert!(!summary.is_partial());

    assert_cell_text(&target, 0, 0, "Income statement");
    assert_eq!(target.cell(0, 0).col_span, 3);
    assert!(target.cell(0, 2).hidden);
    let field = target.cell(2, 1);
    assert_eq!(field.cell_type, CellType::Field);
    assert_eq!(field.binding.unwrap().table, "sales");
    assert_eq!(target.config("B3").unwrap().cell_type, CellType::Field);

    // Serializing the applied table gives the same document body.
    let again = current_snapshot(&target.state).unwrap().to_value().unwrap();
    assert_eq!(again["tableData"], document["tableData"]);
    assert_eq!(again["cellMergeInfo"], document["cellMergeInfo"]);
    assert_eq!(again["cellConfigurations"], document["cellConfigurations"]);
}

#[test]
fn test_apply_into_smaller_table_is_partial() {
    let source = designed_report();
    let document = current_snapshot(&source.state).unwrap().to_value().unwrap();

    let target = TestHarness::with_size(2, 4);
    let summary = apply_document(&target.state, &document).unwrap();

    assert!(summary.is_partial());
    assert_eq!(summary.skipped, 2);
    assert_cell_text(&target, 1, 1, "Q1");
}

#[test]
fn test_apply_rejects_non_object() {
    let harness = TestHarness::with_sample_data();
    let err = apply_document(&harness.state, &json!([1, 2, 3])).unwrap_err();

    assert!(err.contains("JSON object"));
    assert_cell_text(&harness, 0, 0, "Income statement");
}

// ============================================================================
// EXPORT / IMPORT
// ============================================================================

#[test]
fn test_export_then_import() {
    let dir = tempfile::tempdir().unwrap();
    let settings = DesignerSettings {
        export_dir: dir.path().join("exports"),
        initial_rows: 5,
        initial_cols: 4,
        ..DesignerSettings::default()
    };
    let source = TestHarness::with_settings(settings.clone());
    source.set_text(2, 0, "Revenue");
    drop_field(&source.state, 2, 1, "sales", "amount", None).unwrap();

    let path = export_config(&source.state).unwrap();
    let name = path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("table_config_") && name.ends_with(".json"));

    let target = TestHarness::with_settings(settings);
    let summary = import_config(&target.state, &path).unwrap();

    assert_eq!(summary.applied, 2);
    assert_cell_text(&target, 2, 1, "{amount}");
}

#[test]
fn test_import_bad_file_leaves_table_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ this is not json").unwrap();

    let harness = TestHarness::with_sample_data();
    assert!(import_config(&harness.state, &path).is_err());
    assert_cell_text(&harness, 2, 0, "Revenue");
}

// ============================================================================
// DETAIL REPORTS
// ============================================================================

#[test]
fn test_detail_report_section_round_trip() {
    let source = TestHarness::with_size(3, 3);
    set_data_source(
        &source.state,
        Some(DataSourceSelection {
            data_source: "erp".to_string(),
            table: "sales".to_string(),
            schema: String::new(),
        }),
    )
    .unwrap();
    set_field_catalog(
        &source.state,
        FieldCatalog::new(vec![
            FieldInfo { name: "region".to_string(), label: "Region".to_string() },
            FieldInfo { name: "amount".to_string(), label: "Amount".to_string() },
        ]),
    )
    .unwrap();
    drop_field(&source.state, 0, 1, "sales", "amount", None).unwrap();
    drop_field(&source.state, 0, 0, "sales", "region", None).unwrap();

    let value = current_snapshot(&source.state).unwrap().to_value().unwrap();
    let detail = &value["detailReportConfig"];
    assert_eq!(detail["selectedDataSource"], "erp");
    assert_eq!(detail["selectedCols"], json!(["region", "amount"]));
    assert_eq!(detail["fieldLabels"]["amount"], "Amount");
    assert_eq!(value["filterFields"], json!([]));

    let target = TestHarness::with_size(3, 3);
    apply_document(&target.state, &value).unwrap();
    let source_selection = target.state.data_source.lock().unwrap().clone();
    assert_eq!(source_selection.map(|s| s.table), Some("sales".to_string()));
}

// ============================================================================
// RESET AND VIEWER
// ============================================================================

#[test]
fn test_clear_all_configs() {
    let harness = TestHarness::with_sample_data();
    select_cell(&harness.state, 0, 0, false).unwrap();
    select_cell(&harness.state, 1, 0, false).unwrap();
    assert!(harness.stored("cellConfig_A1").is_some());

    let removed = clear_all_configs(&harness.state).unwrap();

    assert!(removed >= 1);
    assert!(harness.stored("cellConfig_A1").is_none());
    assert!(harness.state.configs.lock().unwrap().is_empty());

    // New records leave out the extra dimensions.
    let info = select_cell(&harness.state, 0, 0, false).unwrap();
    assert_eq!(info.config.currency, None);
    assert_eq!(info.config.organization, None);
    // Cell content is not part of the reset.
    assert_cell_text(&harness, 0, 0, "Income statement");
}

#[test]
fn test_viewer_payload_round_trip() {
    let harness = designed_report();
    set_column_widths(&harness.state, vec![10, 150]).unwrap();
    assert_eq!(load_last_viewed(&harness.state).unwrap(), None);

    let payload = save_last_viewed(&harness.state).unwrap();

    assert_eq!(payload.col_widths, vec![30, 150, 100, 100]);
    assert_eq!(payload.rows.len(), 5);
    assert_eq!(payload.rows[0].row, "1");
    assert_eq!(payload.rows[0].cells["A"].colspan, 3);
    assert!(!payload.rows[0].cells.contains_key("B"));
    assert_eq!(load_last_viewed(&harness.state).unwrap(), Some(payload));
}
