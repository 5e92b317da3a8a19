//! FILENAME: tests/test_settings_storage.rs
//! Settings-driven storage: configurations outlive the session when a
//! storage file is configured.

mod common;

use common::TestHarness;
use designer_lib::cell_commands::{save_cell_config, select_cell};
use designer_lib::{load_settings, open_storage, DesignerSettings};
use report_persistence::CellConfigPatch;

fn file_settings(dir: &std::path::Path) -> DesignerSettings {
    DesignerSettings {
        storage_path: Some(dir.join("state").join("designer-store.json")),
        initial_rows: 6,
        initial_cols: 6,
        ..DesignerSettings::default()
    }
}

#[test]
fn test_configs_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let settings = file_settings(dir.path());

    {
        let storage = open_storage(&settings).unwrap();
        let harness = TestHarness::with_storage(settings.clone(), storage);
        harness.set_text(0, 0, "Revenue");
        select_cell(&harness.state, 0, 0, false).unwrap();
        save_cell_config(
            &harness.state,
            0,
            0,
            CellConfigPatch {
                name: Some("Net revenue".to_string()),
                ..CellConfigPatch::default()
            },
        )
        .unwrap();
    }

    assert!(dir.path().join("state").join("designer-store.json").exists());

    let storage = open_storage(&settings).unwrap();
    let harness = TestHarness::with_storage(settings, storage);
    let config = harness.config("A1").expect("config reloaded from the store file");
    assert_eq!(config.name.as_deref(), Some("Net revenue"));
}

#[test]
fn test_memory_storage_without_path() {
    let settings = DesignerSettings::default();
    let storage = open_storage(&settings).unwrap();
    let harness = TestHarness::with_storage(settings, storage);
    assert!(harness.stored("cellConfig_A1").is_none());
}

#[test]
fn test_settings_file_feeds_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("designer.json");
    std::fs::write(&path, r#"{ "initialRows": 3, "initialCols": 2, "reportTitle": "Balance" }"#).unwrap();

    let settings = load_settings(Some(&path)).unwrap();
    let harness = TestHarness::with_settings(settings);

    let grid = harness.state.grid.lock().unwrap();
    assert_eq!((grid.row_count(), grid.col_count()), (3, 2));
    drop(grid);
    assert_eq!(harness.state.node_info.lock().unwrap().node_name, "Balance");
}
