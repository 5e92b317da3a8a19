//! FILENAME: app/designer/src/merge_commands.rs
// PURPOSE: Commands for cell merge operations.
// CONTEXT: Merging works on the current selection. The anchor (top-left)
// keeps the combined text; every other cell of the region is hidden.

use crate::api_types::{CellData, MergeResult};
use crate::{log_enter, log_exit, log_info, log_warn, AppState};
use report_engine::{Grid, MergedRegion};
use std::collections::BTreeSet;

fn region_cells(grid: &Grid, region: &MergedRegion) -> Vec<CellData> {
    let mut cells = Vec::new();
    for row in region.start_row..=region.end_row {
        for col in region.start_col..=region.end_col {
            if let Some(cell) = grid.cell(row, col) {
                cells.push(CellData::from_cell(row, col, cell));
            }
        }
    }
    cells
}

/// Merge the selected cells. The selection must be a filled rectangle of at
/// least two cells that touches no existing merge; otherwise nothing changes
/// and the reason is returned as the error.
pub fn merge_selection(state: &AppState) -> Result<MergeResult, String> {
    let mut grid = state.grid.lock().map_err(|e| e.to_string())?;
    let mut merges = state.merges.lock().map_err(|e| e.to_string())?;
    let mut selection = state.selection.lock().map_err(|e| e.to_string())?;

    let selected = selection.cells();
    log_enter!("MERGE", "merge_selection", "cells={}", selected.len());

    if let Err(e) = merges.merge(&mut grid, &selected) {
        log_warn!("MERGE", "merge rejected: {}", e);
        return Err(e.to_string());
    }

    let updated_cells = selected
        .first()
        .and_then(|first| merges.region_of(*first))
        .map(|region| region_cells(&grid, &region))
        .unwrap_or_default();
    selection.clear();

    log_exit!("MERGE", "merge_selection", "updated={}", updated_cells.len());
    Ok(MergeResult {
        success: true,
        merged_regions: merges.regions(),
        updated_cells,
    })
}

/// Unmerge every region touched by the selection.
pub fn unmerge_selection(state: &AppState) -> Result<MergeResult, String> {
    let mut grid = state.grid.lock().map_err(|e| e.to_string())?;
    let mut merges = state.merges.lock().map_err(|e| e.to_string())?;
    let selection = state.selection.lock().map_err(|e| e.to_string())?;

    let selected = selection.cells();
    let regions: BTreeSet<(u32, u32, u32, u32)> = selected
        .iter()
        .filter_map(|pos| merges.region_of(*pos))
        .map(|r| (r.start_row, r.start_col, r.end_row, r.end_col))
        .collect();

    let count = merges.unmerge(&mut grid, &selected).map_err(|e| {
        log_warn!("MERGE", "unmerge rejected: {}", e);
        e.to_string()
    })?;

    let updated_cells = regions
        .into_iter()
        .flat_map(|(start_row, start_col, end_row, end_col)| {
            region_cells(
                &grid,
                &MergedRegion {
                    start_row,
                    start_col,
                    end_row,
                    end_col,
                },
            )
        })
        .collect();

    log_info!("MERGE", "unmerged {} region(s)", count);
    Ok(MergeResult {
        success: true,
        merged_regions: merges.regions(),
        updated_cells,
    })
}

/// Get all merged regions, ordered by anchor position.
pub fn get_merged_regions(state: &AppState) -> Result<Vec<MergedRegion>, String> {
    let merges = state.merges.lock().map_err(|e| e.to_string())?;
    Ok(merges.regions())
}

/// Check if a cell is part of a merged region.
/// Returns the region's extent if it is.
pub fn get_merge_info(state: &AppState, row: u32, col: u32) -> Result<Option<MergedRegion>, String> {
    let merges = state.merges.lock().map_err(|e| e.to_string())?;
    Ok(merges.region_of((row, col)))
}
