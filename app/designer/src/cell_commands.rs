//! FILENAME: app/designer/src/cell_commands.rs
// PURPOSE: Commands for selecting, editing, formatting and configuring cells.
// CONTEXT: Configuration records are written to storage whenever the user
// leaves a cell (no batching). Storage failures are logged and never undo
// the in-memory edit.

use crate::api_types::{CellData, CellInfo, FormatAction};
use crate::{log_debug, log_enter, log_error, log_exit, log_info, log_warn, AppState};
use report_engine::{
    coord_to_a1, CellCoord, CellRef, CellType, FieldBinding, Grid, MergeTracker, StyleProperty,
};
use report_persistence::{CellConfig, CellConfigPatch, CellConfigStore};

fn check_bounds(grid: &Grid, coord: CellCoord) -> Result<(), String> {
    if grid.contains(coord) {
        Ok(())
    } else {
        Err(format!("cell {} is outside the table", coord_to_a1(coord)))
    }
}

/// Hidden cells stand in for the anchor of their region.
fn resolve_visible(merges: &MergeTracker, grid: &Grid, coord: CellCoord) -> CellCoord {
    let hidden = grid.cell(coord.0, coord.1).map(|c| c.hidden).unwrap_or(false);
    if !hidden {
        return coord;
    }
    merges
        .anchor_of(coord)
        .map(|anchor| anchor.coord())
        .unwrap_or(coord)
}

fn persist_soft(configs: &mut CellConfigStore, cell_ref: &CellRef) {
    if let Err(e) = configs.persist(cell_ref) {
        log_error!("CONFIG", "saving config for {} failed: {}", cell_ref, e);
    }
}

fn cell_data(grid: &Grid, (row, col): CellCoord) -> Result<CellData, String> {
    grid.cell(row, col)
        .map(|cell| CellData::from_cell(row, col, cell))
        .ok_or_else(|| format!("cell {} is outside the table", coord_to_a1((row, col))))
}

pub fn get_cell(state: &AppState, row: u32, col: u32) -> Result<CellData, String> {
    let grid = state.grid.lock().map_err(|e| e.to_string())?;
    cell_data(&grid, (row, col))
}

/// Click on a cell.
///
/// Saves the configuration of the cell being left, updates the selection
/// (`toggle` adds or removes the cell, otherwise it becomes the only selected
/// cell) and returns what the side panel shows for the clicked cell, creating
/// its configuration record on first touch.
pub fn select_cell(state: &AppState, row: u32, col: u32, toggle: bool) -> Result<CellInfo, String> {
    let grid = state.grid.lock().map_err(|e| e.to_string())?;
    let merges = state.merges.lock().map_err(|e| e.to_string())?;
    let mut configs = state.configs.lock().map_err(|e| e.to_string())?;
    let mut selection = state.selection.lock().map_err(|e| e.to_string())?;
    let mut current = state.current_cell.lock().map_err(|e| e.to_string())?;

    check_bounds(&grid, (row, col))?;
    let coord = resolve_visible(&merges, &grid, (row, col));

    if let Some(previous) = current.filter(|prev| *prev != coord) {
        persist_soft(&mut configs, &CellRef::from_coord(previous));
    }

    if toggle {
        selection.toggle(coord);
    } else {
        selection.select_single(coord);
    }

    let cell = grid
        .cell(coord.0, coord.1)
        .ok_or_else(|| format!("cell {} is outside the table", coord_to_a1(coord)))?;
    let cell_ref = CellRef::from_coord(coord);
    let name = Some(cell.content.trim()).filter(|s| !s.is_empty());
    let config = configs
        .get_or_create(&cell_ref, cell.cell_type.clone(), name)
        .clone();
    *current = Some(coord);

    log_debug!("CELL", "selected {} ({} in selection)", cell_ref, selection.len());
    Ok(CellInfo {
        cell: CellData::from_cell(coord.0, coord.1, cell),
        config,
        merge: merges.region_of(coord),
    })
}

/// Drag selection over the rectangle spanned by `start` and `end`.
pub fn select_range(state: &AppState, start: CellCoord, end: CellCoord) -> Result<Vec<CellCoord>, String> {
    let grid = state.grid.lock().map_err(|e| e.to_string())?;
    let mut selection = state.selection.lock().map_err(|e| e.to_string())?;

    check_bounds(&grid, start)?;
    check_bounds(&grid, end)?;
    selection.select_range(start, end);
    Ok(selection.cells())
}

pub fn clear_selection(state: &AppState) -> Result<(), String> {
    let mut selection = state.selection.lock().map_err(|e| e.to_string())?;
    selection.clear();
    Ok(())
}

/// Replace the text of a cell. Emptying a cell drops its type, binding and
/// configured name/source; style is kept.
pub fn set_cell_content(state: &AppState, row: u32, col: u32, text: &str) -> Result<CellData, String> {
    let mut grid = state.grid.lock().map_err(|e| e.to_string())?;
    let mut configs = state.configs.lock().map_err(|e| e.to_string())?;

    check_bounds(&grid, (row, col))?;
    if grid.cell(row, col).map(|c| c.hidden).unwrap_or(false) {
        return Err(format!(
            "cell {} is covered by a merged region",
            coord_to_a1((row, col))
        ));
    }

    grid.set_content(row, col, text);

    if text.trim().is_empty() {
        let cell_ref = CellRef::new(row, col);
        match configs.clear(&cell_ref) {
            Ok(true) => log_debug!("CELL", "purged config of {}", cell_ref),
            Ok(false) => {}
            Err(e) => log_error!("CONFIG", "clearing config for {} failed: {}", cell_ref, e),
        }
    }

    cell_data(&grid, (row, col))
}

/// Toolbar formatting, applied to the selection (or the current cell when
/// nothing is selected). Toggles follow the first target: if it already
/// carries the style, the style is removed from every target.
pub fn apply_formatting(state: &AppState, action: FormatAction) -> Result<Vec<CellData>, String> {
    let mut grid = state.grid.lock().map_err(|e| e.to_string())?;
    let selection = state.selection.lock().map_err(|e| e.to_string())?;
    let current = state.current_cell.lock().map_err(|e| e.to_string())?;

    let mut targets = selection.cells();
    if targets.is_empty() {
        targets.extend(current.iter().copied());
    }
    if targets.is_empty() {
        return Err("select a cell to format".to_string());
    }
    log_enter!("FMT", "apply_formatting", "{:?} on {} cell(s)", action, targets.len());

    let (prop, value, is_toggle) = match &action {
        FormatAction::ToggleBold => (StyleProperty::FontWeight, "bold", true),
        FormatAction::ToggleItalic => (StyleProperty::FontStyle, "italic", true),
        FormatAction::ToggleUnderline => (StyleProperty::TextDecoration, "underline", true),
        FormatAction::FontColor(v) => (StyleProperty::Color, v.trim(), false),
        FormatAction::BackgroundColor(v) => (StyleProperty::BackgroundColor, v.trim(), false),
        FormatAction::FontSize(v) => (StyleProperty::FontSize, v.trim(), false),
        FormatAction::Align(v) => (StyleProperty::TextAlign, v.trim(), false),
    };

    // An empty value clears the override; a toggle flips the first target
    // and the rest follow it.
    let mut rest = &targets[..];
    let set = if is_toggle {
        let (r, c) = targets[0];
        rest = &targets[1..];
        grid.cell_mut(r, c)
            .map(|cell| cell.style.toggle(prop, value))
            .unwrap_or(true)
    } else {
        !value.is_empty()
    };

    for &(row, col) in rest {
        if let Some(cell) = grid.cell_mut(row, col) {
            if set {
                cell.style.set(prop, value);
            } else {
                cell.style.remove(prop);
            }
        }
    }

    let updated: Vec<CellData> = targets
        .iter()
        .filter_map(|&(row, col)| grid.cell(row, col).map(|cell| CellData::from_cell(row, col, cell)))
        .collect();
    log_exit!("FMT", "apply_formatting", "updated={}", updated.len());
    Ok(updated)
}

/// Side panel blur: merge the patch into the cell's record and write it.
/// A type change is mirrored onto the grid cell.
pub fn save_cell_config(
    state: &AppState,
    row: u32,
    col: u32,
    patch: CellConfigPatch,
) -> Result<CellConfig, String> {
    let mut grid = state.grid.lock().map_err(|e| e.to_string())?;
    let mut configs = state.configs.lock().map_err(|e| e.to_string())?;

    check_bounds(&grid, (row, col))?;
    let cell_ref = CellRef::new(row, col);

    if let (Some(cell_type), Some(cell)) = (&patch.cell_type, grid.cell_mut(row, col)) {
        if *cell_type != CellType::Field {
            cell.binding = None;
        }
        cell.cell_type = cell_type.clone();
    }

    let config = configs.set(&cell_ref, &patch).clone();
    persist_soft(&mut configs, &cell_ref);
    log_debug!("CONFIG", "saved config for {}", cell_ref);
    Ok(config)
}

/// Save the configuration of the cell the side panel shows, if any.
pub fn save_current_cell(state: &AppState) -> Result<Option<CellCoord>, String> {
    let mut configs = state.configs.lock().map_err(|e| e.to_string())?;
    let current = state.current_cell.lock().map_err(|e| e.to_string())?;
    if let Some(coord) = *current {
        persist_soft(&mut configs, &CellRef::from_coord(coord));
    }
    Ok(*current)
}

/// Drop a field from the field list onto a cell.
///
/// The display name defaults to the catalog label, then to the field name.
/// A column holds at most one field, and all fields must share a table.
pub fn drop_field(
    state: &AppState,
    row: u32,
    col: u32,
    table: &str,
    field: &str,
    display_name: Option<&str>,
) -> Result<CellData, String> {
    let mut grid = state.grid.lock().map_err(|e| e.to_string())?;
    let mut configs = state.configs.lock().map_err(|e| e.to_string())?;
    let catalog = state.catalog.lock().map_err(|e| e.to_string())?;

    let display = display_name
        .filter(|d| !d.trim().is_empty())
        .or_else(|| catalog.label_for(field))
        .unwrap_or(field)
        .to_string();
    let binding = FieldBinding::new(table, field).with_display_name(display.clone());

    grid.bind_field(row, col, binding).map_err(|e| {
        log_warn!("CELL", "field drop rejected: {}", e);
        e.to_string()
    })?;

    let cell_ref = CellRef::new(row, col);
    let patch = CellConfigPatch {
        cell_type: Some(CellType::Field),
        name: Some(display),
        ..CellConfigPatch::default()
    };
    configs.set(&cell_ref, &patch);
    persist_soft(&mut configs, &cell_ref);

    log_info!("CELL", "bound {}.{} to {}", table, field, cell_ref);
    cell_data(&grid, (row, col))
}

/// Returns the index of the new row.
pub fn append_row(state: &AppState) -> Result<u32, String> {
    let mut grid = state.grid.lock().map_err(|e| e.to_string())?;
    let row = grid.append_row();
    log_debug!("GRID", "appended row {}", row + 1);
    Ok(row)
}

/// Returns the index of the new column.
pub fn append_column(state: &AppState) -> Result<u32, String> {
    let mut grid = state.grid.lock().map_err(|e| e.to_string())?;
    let col = grid.append_column();
    log_debug!("GRID", "appended column {}", coord_to_a1((0, col)));
    Ok(col)
}

/// Write the configuration record of one cell, if it has one.
pub fn persist_cell_config(state: &AppState, row: u32, col: u32) -> Result<bool, String> {
    let mut configs = state.configs.lock().map_err(|e| e.to_string())?;
    let cell_ref = CellRef::new(row, col);
    if configs.get(&cell_ref).is_none() {
        return Ok(false);
    }
    persist_soft(&mut configs, &cell_ref);
    Ok(true)
}
