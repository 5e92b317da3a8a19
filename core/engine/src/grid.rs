//! FILENAME: core/engine/src/grid.rs
//! PURPOSE: The design table model.
//! CONTEXT: The `Grid` is the single owner of cell state while editing. The
//! rendering layer only projects it; merge bookkeeping and configuration
//! records are indices keyed by coordinates into this grid. Storage is dense
//! (rows x columns) since design tables are small and every slot is
//! addressable even when empty.

use crate::cell::{CellType, DesignCell, FieldBinding};
use crate::coord::{coord_to_a1, CellCoord};
use crate::style::StyleProperty;
use thiserror::Error;

/// Background applied to freshly dropped field cells.
pub const FIELD_BACKGROUND: &str = "#e0e0e0";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldDropError {
    #[error("cell {0} is outside the table")]
    OutOfBounds(String),

    #[error("column already holds field '{existing}', cannot add '{incoming}'")]
    ColumnHasField { existing: String, incoming: String },

    #[error("table already uses fields from '{existing}', cannot add fields from '{incoming}'")]
    TableMismatch { existing: String, incoming: String },

    #[error("cell {0} is covered by a merged region")]
    Covered(String),
}

/// The Grid struct holds the state of the design table.
/// Row and Col are 0-based indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: Vec<Vec<DesignCell>>,
    col_count: u32,
}

impl Grid {
    /// Creates a grid of blank cells.
    pub fn new(rows: u32, cols: u32) -> Self {
        Grid {
            rows: (0..rows)
                .map(|_| vec![DesignCell::new(); cols as usize])
                .collect(),
            col_count: cols,
        }
    }

    pub fn row_count(&self) -> u32 {
        self.rows.len() as u32
    }

    pub fn col_count(&self) -> u32 {
        self.col_count
    }

    pub fn contains(&self, (row, col): CellCoord) -> bool {
        row < self.row_count() && col < self.col_count
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&DesignCell> {
        self.rows.get(row as usize)?.get(col as usize)
    }

    pub fn cell_mut(&mut self, row: u32, col: u32) -> Option<&mut DesignCell> {
        self.rows.get_mut(row as usize)?.get_mut(col as usize)
    }

    /// Iterates rows in order; each row is a slice of `col_count` cells.
    pub fn iter_rows(&self) -> impl Iterator<Item = &[DesignCell]> {
        self.rows.iter().map(Vec::as_slice)
    }

    /// Iterates every cell with its coordinate, in reading order.
    pub fn iter_cells(&self) -> impl Iterator<Item = (CellCoord, &DesignCell)> {
        self.rows.iter().enumerate().flat_map(|(r, row)| {
            row.iter()
                .enumerate()
                .map(move |(c, cell)| ((r as u32, c as u32), cell))
        })
    }

    /// Appends a blank row at the bottom. Existing references are unaffected.
    pub fn append_row(&mut self) -> u32 {
        self.rows.push(vec![DesignCell::new(); self.col_count as usize]);
        self.row_count() - 1
    }

    /// Appends a blank column at the right. Existing references are unaffected.
    pub fn append_column(&mut self) -> u32 {
        for row in &mut self.rows {
            row.push(DesignCell::new());
        }
        self.col_count += 1;
        self.col_count - 1
    }

    /// Replaces the text of a cell. Emptying a cell purges its metadata.
    /// Returns false when the coordinate is outside the grid.
    pub fn set_content(&mut self, row: u32, col: u32, text: &str) -> bool {
        let Some(cell) = self.cell_mut(row, col) else {
            return false;
        };
        cell.content = text.to_string();
        if text.trim().is_empty() {
            cell.purge_metadata();
        }
        true
    }

    /// Clears text, type, binding and data attributes; style survives.
    pub fn clear_content(&mut self, row: u32, col: u32) -> bool {
        let Some(cell) = self.cell_mut(row, col) else {
            return false;
        };
        cell.content.clear();
        cell.purge_metadata();
        true
    }

    /// Field cells with their coordinates, in reading order.
    pub fn field_cells(&self) -> Vec<(CellCoord, &FieldBinding)> {
        self.iter_cells()
            .filter(|(_, cell)| cell.cell_type == CellType::Field)
            .filter_map(|(pos, cell)| cell.binding.as_ref().map(|b| (pos, b)))
            .collect()
    }

    /// Binds a dropped field to a cell.
    ///
    /// A column holds at most one field cell, and every field in the table
    /// must come from the same source table.
    pub fn bind_field(
        &mut self,
        row: u32,
        col: u32,
        binding: FieldBinding,
    ) -> Result<(), FieldDropError> {
        if !self.contains((row, col)) {
            return Err(FieldDropError::OutOfBounds(coord_to_a1((row, col))));
        }
        if self.cell(row, col).map(|c| c.hidden).unwrap_or(false) {
            return Err(FieldDropError::Covered(coord_to_a1((row, col))));
        }

        for ((r, c), existing) in self.field_cells() {
            if (r, c) == (row, col) {
                continue;
            }
            if c == col {
                return Err(FieldDropError::ColumnHasField {
                    existing: existing.field.clone(),
                    incoming: binding.field.clone(),
                });
            }
            if existing.table != binding.table {
                return Err(FieldDropError::TableMismatch {
                    existing: existing.table.clone(),
                    incoming: binding.table.clone(),
                });
            }
        }

        let cell = self
            .cell_mut(row, col)
            .ok_or_else(|| FieldDropError::OutOfBounds(coord_to_a1((row, col))))?;
        cell.content = format!("{{{}}}", binding.field);
        cell.cell_type = CellType::Field;
        cell.style.set(StyleProperty::FontWeight, "bold");
        cell.style.set(StyleProperty::BackgroundColor, FIELD_BACKGROUND);
        cell.binding = Some(binding);
        Ok(())
    }
}
