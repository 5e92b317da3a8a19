//! FILENAME: core/engine/src/merge.rs
//! PURPOSE: Merge region bookkeeping for the design grid.
//! CONTEXT: The tracker keeps one record per affected cell, keyed by CellRef:
//! the top-left cell of a region is an Anchor carrying the spans, every other
//! cell of the region is Covered and points back at its Anchor. The grid's
//! span/hidden fields are kept in step with these records; merge and unmerge
//! either fully apply or leave both untouched.

use crate::coord::{CellCoord, CellRef};
use crate::grid::Grid;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    #[error("select at least two cells to merge")]
    InsufficientSelection,

    #[error("selection must be a filled rectangle")]
    NotRectangular,

    #[error("selection contains cells that are already merged, unmerge them first")]
    OverlapsExistingMerge,

    #[error("selected cells carry no merge information")]
    NothingToUnmerge,

    #[error("cell {0} is outside the table")]
    OutOfBounds(CellRef),
}

/// Merge information stored for one cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MergeRecord {
    /// Top-left cell of a merged region.
    #[serde(rename_all = "camelCase")]
    Anchor {
        row_span: u32,
        col_span: u32,
        row_index: u32,
        cell_index: u32,
    },
    /// Cell hidden inside another cell's region.
    #[serde(rename_all = "camelCase")]
    Covered {
        merged_into: CellRef,
        #[serde(default = "hidden_default")]
        hidden: bool,
    },
}

fn hidden_default() -> bool {
    true
}

impl MergeRecord {
    pub fn is_anchor(&self) -> bool {
        matches!(self, MergeRecord::Anchor { .. })
    }
}

/// Rectangular extent of a merged region (inclusive bounds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedRegion {
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
}

impl MergedRegion {
    pub fn contains(&self, (row, col): CellCoord) -> bool {
        row >= self.start_row && row <= self.end_row && col >= self.start_col && col <= self.end_col
    }

    pub fn row_span(&self) -> u32 {
        self.end_row - self.start_row + 1
    }

    pub fn col_span(&self) -> u32 {
        self.end_col - self.start_col + 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeTracker {
    records: BTreeMap<CellRef, MergeRecord>,
}

impl MergeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, cell_ref: &CellRef) -> Option<&MergeRecord> {
        self.records.get(cell_ref)
    }

    pub fn records(&self) -> &BTreeMap<CellRef, MergeRecord> {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Anchor ref of the region containing `coord`, if any.
    pub fn anchor_of(&self, coord: CellCoord) -> Option<CellRef> {
        let cell_ref = CellRef::from_coord(coord);
        match self.records.get(&cell_ref)? {
            MergeRecord::Anchor { .. } => Some(cell_ref),
            MergeRecord::Covered { merged_into, .. } => Some(merged_into.clone()),
        }
    }

    /// Extent of the region containing `coord`, if any.
    pub fn region_of(&self, coord: CellCoord) -> Option<MergedRegion> {
        let anchor = self.anchor_of(coord)?;
        match self.records.get(&anchor)? {
            MergeRecord::Anchor { row_span, col_span, .. } => Some(MergedRegion {
                start_row: anchor.row(),
                start_col: anchor.col(),
                end_row: anchor.row() + row_span - 1,
                end_col: anchor.col() + col_span - 1,
            }),
            MergeRecord::Covered { .. } => None,
        }
    }

    /// All regions, ordered by anchor position.
    pub fn regions(&self) -> Vec<MergedRegion> {
        self.records
            .iter()
            .filter(|(_, rec)| rec.is_anchor())
            .filter_map(|(cell_ref, _)| self.region_of(cell_ref.coord()))
            .collect()
    }

    /// Merges a rectangular selection into its top-left cell.
    ///
    /// The anchor's content becomes the distinct non-empty texts of the
    /// selection joined by spaces, in reading order. Each cell's own
    /// text is not remembered; unmerge only restores layout.
    pub fn merge(
        &mut self,
        grid: &mut Grid,
        selected: &[CellCoord],
    ) -> Result<MergeRecord, MergeError> {
        let cells: BTreeSet<CellCoord> = selected.iter().copied().collect();
        if cells.len() < 2 {
            return Err(MergeError::InsufficientSelection);
        }

        if let Some(outside) = cells.iter().find(|pos| !grid.contains(**pos)) {
            return Err(MergeError::OutOfBounds(CellRef::from_coord(*outside)));
        }

        let min_row = cells.iter().map(|p| p.0).min().unwrap_or(0);
        let max_row = cells.iter().map(|p| p.0).max().unwrap_or(0);
        let min_col = cells.iter().map(|p| p.1).min().unwrap_or(0);
        let max_col = cells.iter().map(|p| p.1).max().unwrap_or(0);
        let row_span = max_row - min_row + 1;
        let col_span = max_col - min_col + 1;

        if cells.len() as u64 != row_span as u64 * col_span as u64 {
            return Err(MergeError::NotRectangular);
        }

        let overlaps = cells.iter().any(|&(row, col)| {
            self.records.contains_key(&CellRef::new(row, col))
                || grid
                    .cell(row, col)
                    .map(|c| c.hidden || c.is_merged_anchor())
                    .unwrap_or(false)
        });
        if overlaps {
            return Err(MergeError::OverlapsExistingMerge);
        }

        // All checks passed; from here on the merge cannot fail.
        let mut seen = BTreeSet::new();
        let mut parts: Vec<String> = Vec::new();
        for &(row, col) in &cells {
            if let Some(cell) = grid.cell(row, col) {
                let text = cell.content.trim();
                if !text.is_empty() && seen.insert(text.to_string()) {
                    parts.push(text.to_string());
                }
            }
        }

        let anchor_ref = CellRef::new(min_row, min_col);
        let anchor_record = MergeRecord::Anchor {
            row_span,
            col_span,
            row_index: min_row,
            cell_index: min_col,
        };

        for &(row, col) in &cells {
            let Some(cell) = grid.cell_mut(row, col) else {
                continue;
            };
            if (row, col) == (min_row, min_col) {
                cell.row_span = row_span;
                cell.col_span = col_span;
                cell.content = parts.join(" ");
            } else {
                cell.hidden = true;
                self.records.insert(
                    CellRef::new(row, col),
                    MergeRecord::Covered {
                        merged_into: anchor_ref.clone(),
                        hidden: true,
                    },
                );
            }
        }
        self.records.insert(anchor_ref.clone(), anchor_record.clone());

        log::debug!(
            "merged {} cells into {} ({}x{})",
            cells.len(),
            anchor_ref,
            row_span,
            col_span
        );
        Ok(anchor_record)
    }

    /// Dissolves every region touched by the selection.
    ///
    /// Returns the number of regions dissolved.
    pub fn unmerge(&mut self, grid: &mut Grid, selected: &[CellCoord]) -> Result<usize, MergeError> {
        let anchors: BTreeSet<CellRef> = selected
            .iter()
            .filter_map(|pos| self.anchor_of(*pos))
            .filter(|anchor| matches!(self.records.get(anchor), Some(MergeRecord::Anchor { .. })))
            .collect();

        if anchors.is_empty() {
            return Err(MergeError::NothingToUnmerge);
        }

        for anchor in &anchors {
            self.dissolve(grid, anchor);
        }

        log::debug!("unmerged {} region(s)", anchors.len());
        Ok(anchors.len())
    }

    fn dissolve(&mut self, grid: &mut Grid, anchor: &CellRef) {
        if let Some(cell) = grid.cell_mut(anchor.row(), anchor.col()) {
            cell.row_span = 1;
            cell.col_span = 1;
        }

        let covered: Vec<CellRef> = self
            .records
            .iter()
            .filter(|(_, rec)| {
                matches!(rec, MergeRecord::Covered { merged_into, .. } if merged_into == anchor)
            })
            .map(|(cell_ref, _)| cell_ref.clone())
            .collect();

        for cell_ref in covered {
            if let Some(cell) = grid.cell_mut(cell_ref.row(), cell_ref.col()) {
                cell.hidden = false;
            }
            self.records.remove(&cell_ref);
        }
        self.records.remove(anchor);
    }

    /// Reverts every tracked cell in the grid to an unmerged 1x1 layout and
    /// forgets all records.
    pub fn reset_layout(&mut self, grid: &mut Grid) {
        for cell_ref in self.records.keys() {
            if let Some(cell) = grid.cell_mut(cell_ref.row(), cell_ref.col()) {
                cell.reset_layout();
            }
        }
        self.records.clear();
    }

    /// Replaces all merge state with `incoming` (e.g. from an imported
    /// document) and projects it onto the grid.
    ///
    /// Anchors are taken in reading order. One is dropped when its region
    /// does not fit the grid, spans a single cell, or meets a cell claimed by
    /// an earlier region. Every cell of an accepted region becomes Covered
    /// whether or not `incoming` lists it; listed Covered records that do not
    /// match an accepted region are ignored. Returns the number of anchors
    /// applied.
    pub fn replace_all(&mut self, grid: &mut Grid, incoming: BTreeMap<CellRef, MergeRecord>) -> usize {
        self.reset_layout(grid);

        let mut claimed: BTreeSet<CellCoord> = BTreeSet::new();
        let mut accepted = 0;
        for (cell_ref, record) in &incoming {
            let MergeRecord::Anchor { row_span, col_span, .. } = record else {
                continue;
            };
            let (row, col) = cell_ref.coord();
            let (row_span, col_span) = ((*row_span).max(1), (*col_span).max(1));
            if row_span == 1 && col_span == 1 {
                log::warn!("dropping merge anchor {}: region is a single cell", cell_ref);
                continue;
            }
            let region = MergedRegion {
                start_row: row,
                start_col: col,
                end_row: row.saturating_add(row_span - 1),
                end_col: col.saturating_add(col_span - 1),
            };
            if !grid.contains((region.end_row, region.end_col)) {
                log::warn!("dropping merge anchor {} outside the table", cell_ref);
                continue;
            }
            let cells = region_cells(&region);
            if cells.iter().any(|pos| claimed.contains(pos)) {
                log::warn!("dropping merge anchor {}: overlaps an earlier region", cell_ref);
                continue;
            }
            claimed.extend(cells.iter().copied());
            self.project(grid, &region);
            accepted += 1;
        }

        for (cell_ref, record) in &incoming {
            let MergeRecord::Covered { merged_into, .. } = record else {
                continue;
            };
            let matches_region = matches!(
                self.records.get(cell_ref),
                Some(MergeRecord::Covered { merged_into: anchor, .. }) if anchor == merged_into
            );
            if !matches_region {
                log::warn!("ignoring covered cell {}: not inside region {}", cell_ref, merged_into);
            }
        }

        accepted
    }

    /// Writes the records and grid layout of one region, trusted to fit and
    /// to be free of other merges.
    fn project(&mut self, grid: &mut Grid, region: &MergedRegion) {
        let anchor_ref = CellRef::new(region.start_row, region.start_col);
        for (row, col) in region_cells(region) {
            let Some(cell) = grid.cell_mut(row, col) else {
                continue;
            };
            if (row, col) == (region.start_row, region.start_col) {
                cell.row_span = region.row_span();
                cell.col_span = region.col_span();
                cell.hidden = false;
                self.records.insert(
                    anchor_ref.clone(),
                    MergeRecord::Anchor {
                        row_span: region.row_span(),
                        col_span: region.col_span(),
                        row_index: row,
                        cell_index: col,
                    },
                );
            } else {
                cell.reset_layout();
                cell.hidden = true;
                self.records.insert(
                    CellRef::new(row, col),
                    MergeRecord::Covered {
                        merged_into: anchor_ref.clone(),
                        hidden: true,
                    },
                );
            }
        }
    }

    /// Makes every grid cell's spans and visibility agree with the records:
    /// anchors carry their recorded spans, covered cells are hidden, every
    /// other cell is a visible 1x1.
    pub fn sync_grid(&self, grid: &mut Grid) {
        for row in 0..grid.row_count() {
            for col in 0..grid.col_count() {
                let record = self.records.get(&CellRef::new(row, col));
                let Some(cell) = grid.cell_mut(row, col) else {
                    continue;
                };
                match record {
                    Some(MergeRecord::Anchor { row_span, col_span, .. }) => {
                        cell.row_span = *row_span;
                        cell.col_span = *col_span;
                        cell.hidden = false;
                    }
                    Some(MergeRecord::Covered { .. }) => {
                        cell.row_span = 1;
                        cell.col_span = 1;
                        cell.hidden = true;
                    }
                    None => cell.reset_layout(),
                }
            }
        }
    }
}

fn region_cells(region: &MergedRegion) -> Vec<CellCoord> {
    let mut cells = Vec::new();
    for row in region.start_row..=region.end_row {
        for col in region.start_col..=region.end_col {
            cells.push((row, col));
        }
    }
    cells
}
