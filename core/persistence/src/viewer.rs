//! FILENAME: core/persistence/src/viewer.rs
//! PURPOSE: The payload handed to the read-only table viewer.
//! CONTEXT: The viewer renders rows keyed by column letter, so it needs no
//! knowledge of the design grid. The payload is stored under
//! `lastViewedTableData`.

use crate::error::PersistenceError;
use crate::storage::{KeyValueStore, LAST_VIEWED_KEY};
use report_engine::{index_to_col, Grid};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const MIN_COL_WIDTH: u32 = 30;
pub const DEFAULT_COL_WIDTH: u32 = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerCell {
    pub content: String,
    #[serde(rename = "type")]
    pub cell_type: String,
    pub colspan: u32,
    pub rowspan: u32,
    #[serde(default)]
    pub style: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerRow {
    /// 1-based row number as text.
    #[serde(rename = "__row")]
    pub row: String,
    #[serde(flatten)]
    pub cells: BTreeMap<String, ViewerCell>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerPayload {
    pub rows: Vec<ViewerRow>,
    pub col_widths: Vec<u32>,
}

impl ViewerPayload {
    /// Builds the payload from the grid. `col_widths` gives measured widths
    /// per column; missing entries get the default and every width is at
    /// least `MIN_COL_WIDTH`.
    pub fn from_grid(grid: &Grid, col_widths: &[u32]) -> Self {
        let rows = grid
            .iter_rows()
            .enumerate()
            .map(|(r, cells)| ViewerRow {
                row: (r + 1).to_string(),
                cells: cells
                    .iter()
                    .enumerate()
                    .filter(|(_, cell)| !cell.hidden)
                    .map(|(c, cell)| {
                        (
                            index_to_col(c as u32),
                            ViewerCell {
                                content: cell.content.trim().to_string(),
                                cell_type: cell.cell_type.as_str().to_string(),
                                colspan: cell.col_span,
                                rowspan: cell.row_span,
                                style: cell.style.to_css_map(),
                            },
                        )
                    })
                    .collect(),
            })
            .collect();

        let col_widths = (0..grid.col_count() as usize)
            .map(|c| {
                col_widths
                    .get(c)
                    .copied()
                    .unwrap_or(DEFAULT_COL_WIDTH)
                    .max(MIN_COL_WIDTH)
            })
            .collect();

        ViewerPayload { rows, col_widths }
    }
}

pub fn save_last_viewed(
    storage: &mut dyn KeyValueStore,
    payload: &ViewerPayload,
) -> Result<(), PersistenceError> {
    let json = serde_json::to_string(payload)?;
    storage.set_item(LAST_VIEWED_KEY, &json)
}

pub fn load_last_viewed(storage: &dyn KeyValueStore) -> Result<Option<ViewerPayload>, PersistenceError> {
    match storage.get_item(LAST_VIEWED_KEY)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}
