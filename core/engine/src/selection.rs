//! FILENAME: core/engine/src/selection.rs
//! PURPOSE: Multi-cell selection on the design grid.
//! CONTEXT: Supports drag selection of a rectangular range and ctrl/cmd
//! toggling of single cells. The merge tracker consumes the resulting set.

use crate::coord::CellCoord;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    cells: BTreeSet<CellCoord>,
    /// Cell where the last drag or click happened.
    last: Option<CellCoord>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the selection with the rectangle spanned by two corners.
    pub fn select_range(&mut self, start: CellCoord, end: CellCoord) {
        self.cells.clear();
        let (min_row, max_row) = (start.0.min(end.0), start.0.max(end.0));
        let (min_col, max_col) = (start.1.min(end.1), start.1.max(end.1));
        for row in min_row..=max_row {
            for col in min_col..=max_col {
                self.cells.insert((row, col));
            }
        }
        self.last = Some(end);
    }

    /// Replaces the selection with a single cell.
    pub fn select_single(&mut self, coord: CellCoord) {
        self.cells.clear();
        self.cells.insert(coord);
        self.last = Some(coord);
    }

    /// Adds or removes one cell, keeping the rest.
    pub fn toggle(&mut self, coord: CellCoord) -> bool {
        self.last = Some(coord);
        if !self.cells.remove(&coord) {
            self.cells.insert(coord);
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn contains(&self, coord: CellCoord) -> bool {
        self.cells.contains(&coord)
    }

    /// Selected cells in reading order.
    pub fn cells(&self) -> Vec<CellCoord> {
        self.cells.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn last(&self) -> Option<CellCoord> {
        self.last
    }
}
