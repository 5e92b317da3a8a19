//! FILENAME: app/designer/src/lib.rs
// PURPOSE: Main library entry point of the report designer.
// CONTEXT: Explicit application state replaces page globals. Commands take
// `&AppState`, lock what they need and return `Result<_, String>` so any UI
// shell can call them directly.

use report_engine::{CellCoord, Grid, MergeTracker, Selection};
use report_persistence::{
    CellConfigStore, ConfigProfile, DataSourceSelection, FieldCatalog, FileStore, FilterField,
    KeyValueStore, MemoryStore,
};
use std::sync::Mutex;

pub mod api_types;
pub mod cell_commands;
pub mod events;
pub mod logging;
pub mod merge_commands;
pub mod remote;
pub mod settings;
pub mod snapshot_commands;

pub use api_types::{
    ApplySummary, CellData, CellInfo, FormatAction, MergeResult, NodeInfo, Notification,
    NotificationKind,
};
pub use events::{dispatch, DesignerEvent, EventOutcome};
pub use logging::{init_log_file, next_seq, write_log};
pub use remote::{load_from_remote, save_to_remote, HttpPanelClient, PanelApi, RemoteError};
pub use settings::{load_settings, DesignerSettings, SettingsError};

// ============================================================================
// APPLICATION STATE
// ============================================================================

/// State of one editing session.
///
/// Lock order, when a command needs several fields: grid, merges, configs,
/// selection, current_cell, then the remaining fields.
pub struct AppState {
    pub settings: DesignerSettings,
    pub grid: Mutex<Grid>,
    pub merges: Mutex<MergeTracker>,
    pub configs: Mutex<CellConfigStore>,
    pub selection: Mutex<Selection>,
    /// Cell whose configuration the side panel shows
    pub current_cell: Mutex<Option<CellCoord>>,
    pub node_info: Mutex<NodeInfo>,
    pub catalog: Mutex<FieldCatalog>,
    /// Set when the report is a detail report
    pub data_source: Mutex<Option<DataSourceSelection>>,
    pub filter_fields: Mutex<Vec<FilterField>>,
    /// Measured column widths handed to the viewer
    pub col_widths: Mutex<Vec<u32>>,
}

/// Opens the durable store named by the settings, or an in-memory one.
pub fn open_storage(settings: &DesignerSettings) -> Result<Box<dyn KeyValueStore>, String> {
    match &settings.storage_path {
        Some(path) => {
            let store = FileStore::open(path).map_err(|e| e.to_string())?;
            log_info!("SYS", "Using storage file {}", path.display());
            Ok(Box::new(store))
        }
        None => {
            log_info!("SYS", "Using in-memory storage");
            Ok(Box::new(MemoryStore::new()))
        }
    }
}

pub fn create_app_state(settings: DesignerSettings, storage: Box<dyn KeyValueStore>) -> AppState {
    log_enter_info!(
        "SYS",
        "create_app_state",
        "rows={} cols={}",
        settings.initial_rows,
        settings.initial_cols
    );

    let mut configs = CellConfigStore::new(storage, ConfigProfile::Full);
    let loaded = configs.load_all();

    let node_info = NodeInfo {
        node_name: settings.report_title.clone(),
        node_type: settings.node_type.clone(),
        ..NodeInfo::default()
    };

    let state = AppState {
        grid: Mutex::new(Grid::new(settings.initial_rows, settings.initial_cols)),
        merges: Mutex::new(MergeTracker::new()),
        configs: Mutex::new(configs),
        selection: Mutex::new(Selection::new()),
        current_cell: Mutex::new(None),
        node_info: Mutex::new(node_info),
        catalog: Mutex::new(FieldCatalog::default()),
        data_source: Mutex::new(None),
        filter_fields: Mutex::new(Vec::new()),
        col_widths: Mutex::new(Vec::new()),
        settings,
    };

    log_exit_info!("SYS", "create_app_state", "loaded {} cell configurations", loaded);
    state
}

/// Replaces the field catalog offered by the current data source.
pub fn set_field_catalog(state: &AppState, catalog: FieldCatalog) -> Result<usize, String> {
    let mut current = state.catalog.lock().map_err(|e| e.to_string())?;
    *current = catalog;
    Ok(current.len())
}

/// Switches the report to a detail report over `source`, or back to a plain
/// report with `None`.
pub fn set_data_source(state: &AppState, source: Option<DataSourceSelection>) -> Result<(), String> {
    let mut current = state.data_source.lock().map_err(|e| e.to_string())?;
    *current = source;
    Ok(())
}

pub fn set_filter_fields(state: &AppState, fields: Vec<FilterField>) -> Result<(), String> {
    let mut current = state.filter_fields.lock().map_err(|e| e.to_string())?;
    *current = fields;
    Ok(())
}

pub fn set_node_info(state: &AppState, info: NodeInfo) -> Result<(), String> {
    let mut current = state.node_info.lock().map_err(|e| e.to_string())?;
    *current = info;
    Ok(())
}

pub fn set_column_widths(state: &AppState, widths: Vec<u32>) -> Result<(), String> {
    let mut current = state.col_widths.lock().map_err(|e| e.to_string())?;
    *current = widths;
    Ok(())
}
