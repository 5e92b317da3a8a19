//! FILENAME: app/designer/src/snapshot_commands.rs
// PURPOSE: Commands that turn the design state into documents and back.
// CONTEXT: Covers the table snapshot, export/import files, the configuration
// reset and the hand-off to the read-only viewer. Remote save/load builds on
// `current_snapshot` and `apply_document` (see remote.rs).

use crate::api_types::ApplySummary;
use crate::{log_enter_info, log_exit_info, log_info, log_warn, AppState};
use report_persistence::{
    apply_snapshot, export_snapshot, import_document, serialize_table, viewer, SerializeOptions,
    TableSnapshot, ViewerPayload,
};
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Snapshot of the live design state.
pub fn current_snapshot(state: &AppState) -> Result<TableSnapshot, String> {
    let grid = state.grid.lock().map_err(|e| e.to_string())?;
    let merges = state.merges.lock().map_err(|e| e.to_string())?;
    let configs = state.configs.lock().map_err(|e| e.to_string())?;
    let node_info = state.node_info.lock().map_err(|e| e.to_string())?;
    let catalog = state.catalog.lock().map_err(|e| e.to_string())?;
    let data_source = state.data_source.lock().map_err(|e| e.to_string())?;
    let filter_fields = state.filter_fields.lock().map_err(|e| e.to_string())?;

    let options = SerializeOptions {
        title: &node_info.node_name,
        node_type: Some(node_info.node_type.as_str()).filter(|t| !t.is_empty()),
        detail_source: data_source.as_ref(),
        catalog: Some(&*catalog),
        filter_fields: (data_source.is_some() || !filter_fields.is_empty())
            .then_some(filter_fields.as_slice()),
    };
    Ok(serialize_table(&grid, &merges, &configs, &options))
}

/// Apply a document (imported or loaded remotely) to the live table.
///
/// Only a document that is not a JSON object is rejected; everything else is
/// applied best effort and the counts say how much made it. A detail-report
/// section switches the session to that data source.
pub fn apply_document(state: &AppState, document: &Value) -> Result<ApplySummary, String> {
    let mut grid = state.grid.lock().map_err(|e| e.to_string())?;
    let mut merges = state.merges.lock().map_err(|e| e.to_string())?;
    let mut configs = state.configs.lock().map_err(|e| e.to_string())?;
    let mut selection = state.selection.lock().map_err(|e| e.to_string())?;
    let mut current = state.current_cell.lock().map_err(|e| e.to_string())?;

    log_enter_info!("SNAPSHOT", "apply_document");
    let report = apply_snapshot(document, &mut grid, &mut merges, &mut configs)
        .map_err(|e| e.to_string())?;

    selection.clear();
    *current = None;

    if let Some(detail) = &report.detail_report_config {
        let mut data_source = state.data_source.lock().map_err(|e| e.to_string())?;
        *data_source = Some(detail.source());
    }
    if let Some(fields) = &report.filter_fields {
        let mut filter_fields = state.filter_fields.lock().map_err(|e| e.to_string())?;
        *filter_fields = fields.clone();
    }

    let summary = ApplySummary::from(&report);
    if summary.is_partial() {
        log_warn!(
            "SNAPSHOT",
            "applied {} of {} cells, {} outside the table",
            summary.applied,
            summary.attempted,
            summary.skipped
        );
    }
    log_exit_info!("SNAPSHOT", "apply_document", "{}/{} cells", summary.applied, summary.attempted);
    Ok(summary)
}

/// Write the current snapshot to the export directory.
pub fn export_config(state: &AppState) -> Result<PathBuf, String> {
    let snapshot = current_snapshot(state)?;
    let path = export_snapshot(
        &snapshot,
        &state.settings.export_dir,
        &state.settings.export_base_name,
    )
    .map_err(|e| e.to_string())?;
    log_info!("SNAPSHOT", "exported {} cells to {}", snapshot.record_count(), path.display());
    Ok(path)
}

/// Read an exported file and apply it. A file that is not a table
/// configuration leaves the table untouched.
pub fn import_config(state: &AppState, path: &Path) -> Result<ApplySummary, String> {
    let document = import_document(path).map_err(|e| {
        log_warn!("SNAPSHOT", "import of {} failed: {}", path.display(), e);
        e.to_string()
    })?;
    apply_document(state, &document)
}

/// Forget every cell configuration, in memory and in storage. Records
/// created afterwards use the reduced `Cleared` profile.
pub fn clear_all_configs(state: &AppState) -> Result<usize, String> {
    let mut configs = state.configs.lock().map_err(|e| e.to_string())?;
    let mut current = state.current_cell.lock().map_err(|e| e.to_string())?;
    let removed = configs.clear_all();
    *current = None;
    Ok(removed)
}

/// Store the viewer payload so the preview can render the table.
pub fn save_last_viewed(state: &AppState) -> Result<ViewerPayload, String> {
    let grid = state.grid.lock().map_err(|e| e.to_string())?;
    let mut configs = state.configs.lock().map_err(|e| e.to_string())?;
    let widths = state.col_widths.lock().map_err(|e| e.to_string())?;

    let payload = ViewerPayload::from_grid(&grid, &widths);
    viewer::save_last_viewed(configs.storage_mut(), &payload).map_err(|e| e.to_string())?;
    Ok(payload)
}

pub fn load_last_viewed(state: &AppState) -> Result<Option<ViewerPayload>, String> {
    let configs = state.configs.lock().map_err(|e| e.to_string())?;
    viewer::load_last_viewed(configs.storage()).map_err(|e| e.to_string())
}
