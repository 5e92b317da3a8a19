//! FILENAME: core/engine/src/lib.rs
//! PURPOSE: Main library entry point for the report design engine.
//! CONTEXT: Re-exports public types and modules for use by other crates.

pub mod cell;
pub mod coord;
pub mod grid;
pub mod merge;
pub mod selection;
pub mod style;

// Re-export commonly used types at the crate root
pub use cell::{CellType, DesignCell, FieldBinding};
pub use coord::{a1_to_coord, col_to_index, coord_to_a1, index_to_col, CellCoord, CellRef};
pub use grid::{FieldDropError, Grid, FIELD_BACKGROUND};
pub use merge::{MergeError, MergeRecord, MergeTracker, MergedRegion};
pub use selection::Selection;
pub use style::{Color, StyleError, StyleOverrides, StyleProperty};
